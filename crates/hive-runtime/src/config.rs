//! Runtime configuration.
//!
//! Loaded from TOML and overridable through environment variables:
//!
//! - `HIVE_POOL_SIZE`: default pool worker count
//! - `HIVE_DEBUG`: enable debug diagnostics (`true`/`false`)
//!
//! # Example
//!
//! ```
//! use hive_runtime::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_toml("pool_size = 2").unwrap();
//! assert_eq!(config.pool_size, 2);
//! config.validate().unwrap();
//! ```

use crate::error::RuntimeError;
use serde::{Deserialize, Serialize};

/// Upper sanity bound for the default pool.
const MAX_POOL_SIZE: usize = 4096;

/// Configuration for [`runtime::init`](crate::runtime::init).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker count of the default pool.
    ///
    /// Defaults to the hardware parallelism. Zero is legal: the
    /// default pool then exists but runs nothing until grown.
    pub pool_size: usize,

    /// Enable debug diagnostics.
    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pool_size: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            debug: false,
        }
    }
}

impl RuntimeConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with an explicit default pool size.
    #[must_use]
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Self::default()
        }
    }

    /// Deserializes from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the TOML error on malformed input.
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Serializes to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Applies `HIVE_*` environment overrides on top of this config.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(size) = std::env::var("HIVE_POOL_SIZE")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
        {
            self.pool_size = size;
        }
        if let Ok(raw) = std::env::var("HIVE_DEBUG") {
            self.debug = matches!(raw.as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::InvalidConfig`] when `pool_size` exceeds the
    /// sanity bound.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.pool_size > MAX_POOL_SIZE {
            return Err(RuntimeError::InvalidConfig(format!(
                "pool_size {} exceeds the maximum of {MAX_POOL_SIZE}",
                self.pool_size
            )));
        }
        Ok(())
    }
}
