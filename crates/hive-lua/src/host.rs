//! Host environment.
//!
//! The host is the Lua state the embedding application (or the CLI)
//! drives directly. It carries the same baseline libraries and
//! `hive.*` modules as instance contexts, but no instance slot:
//! processes created from the host are roots (`parent()` is nil) and
//! `hive.get` cannot park anything.
//!
//! # Example
//!
//! ```no_run
//! use hive_lua::HostEnv;
//!
//! let lua = HostEnv::new().create_lua().unwrap();
//! lua.load(r#"
//!     local p = hive.process.new(function(msg) hive.log(msg) end)
//!     p("hello")
//! "#).exec().unwrap();
//! ```

use crate::bindings;
use crate::context::new_baseline_lua;
use crate::error::LuaError;
use mlua::Lua;

/// Builder for host Lua states.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostEnv;

impl HostEnv {
    /// Creates a host environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Creates a host Lua state with the `hive.*` modules installed.
    ///
    /// # Errors
    ///
    /// Returns [`LuaError`] if module installation fails.
    pub fn create_lua(&self) -> Result<Lua, LuaError> {
        let lua = new_baseline_lua();
        bindings::register(&lua)?;
        Ok(lua)
    }
}
