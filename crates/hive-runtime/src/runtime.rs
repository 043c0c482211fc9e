//! Runtime lifecycle: the default pool.
//!
//! The default pool is a process-wide resource with an explicit
//! [`init`] / [`shutdown`] pair; it is never constructed lazily, so
//! there is no initialization race to lose. Processes built without
//! an explicit pool bind to it.
//!
//! # Example
//!
//! ```
//! use hive_runtime::config::RuntimeConfig;
//! use hive_runtime::runtime;
//!
//! let pool = runtime::init(&RuntimeConfig::with_pool_size(1)).unwrap();
//! assert_eq!(pool.size(), 1);
//! runtime::shutdown();
//! ```

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::pool::Pool;
use parking_lot::Mutex;
use std::sync::{Arc, LazyLock};
use tracing::info;

static DEFAULT_POOL: LazyLock<Mutex<Option<Arc<Pool>>>> = LazyLock::new(|| Mutex::new(None));

/// Initializes the runtime and installs the default pool.
///
/// # Errors
///
/// - [`RuntimeError::AlreadyInitialized`] on a second `init` without
///   an intervening [`shutdown`].
/// - [`RuntimeError::InvalidConfig`] from config validation.
/// - [`RuntimeError::Pool`] if workers cannot be spawned.
pub fn init(config: &RuntimeConfig) -> Result<Arc<Pool>, RuntimeError> {
    config.validate()?;
    let mut slot = DEFAULT_POOL.lock();
    if slot.is_some() {
        return Err(RuntimeError::AlreadyInitialized);
    }
    let pool = Pool::new(config.pool_size)?;
    *slot = Some(Arc::clone(&pool));
    info!(workers = config.pool_size, "runtime initialized");
    Ok(pool)
}

/// Returns the default pool, if the runtime is initialized.
#[must_use]
pub fn default_pool() -> Option<Arc<Pool>> {
    DEFAULT_POOL.lock().clone()
}

/// Returns the default pool or [`RuntimeError::NotInitialized`].
pub fn require_default_pool() -> Result<Arc<Pool>, RuntimeError> {
    default_pool().ok_or(RuntimeError::NotInitialized)
}

/// Tears the runtime down: drains and joins the default pool's
/// workers. A no-op when not initialized.
pub fn shutdown() {
    let pool = DEFAULT_POOL.lock().take();
    if let Some(pool) = pool {
        pool.shutdown();
        info!("runtime shut down");
    }
}
