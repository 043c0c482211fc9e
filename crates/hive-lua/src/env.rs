//! Environment serialization.
//!
//! A process environment is the pair `{f, e}`: the entry function and
//! an optional error handler. [`encode`] dumps both as binary chunks
//! into an opaque [`EnvBlob`]; [`decode`] loads them back into a fresh
//! context. The recovered functions behave identically to the
//! originals for self-contained functions; upvalues are not captured
//! (instances are isolated, shared state travels through channels).

use crate::error::LuaError;
use hive_runtime::EnvBlob;
use mlua::{ChunkMode, Function, Lua};

/// The `{f, e}` pair recovered from an [`EnvBlob`].
pub struct EnvFunctions {
    /// Entry function, invoked once per message.
    pub entry: Function,
    /// Error handler, if the environment carries one.
    pub handler: Option<Function>,
}

/// Serializes an entry function and optional error handler.
///
/// # Errors
///
/// [`LuaError::Encode`] if either function has no binary form (only
/// pure Lua functions can travel into fresh contexts).
pub fn encode(entry: &Function, handler: Option<&Function>) -> Result<EnvBlob, LuaError> {
    let entry_bytes = dump(entry, "environment function")?;
    let handler_bytes = handler.map(|h| dump(h, "error function")).transpose()?;
    Ok(EnvBlob::new(entry_bytes, handler_bytes))
}

/// Loads the `{f, e}` pair of a blob into `lua`.
///
/// # Errors
///
/// [`LuaError::Decode`] if a chunk fails to load.
pub fn decode(lua: &Lua, blob: &EnvBlob) -> Result<EnvFunctions, LuaError> {
    let entry = load(lua, blob.entry(), "env.f")?;
    let handler = blob
        .handler()
        .map(|bytes| load(lua, bytes, "env.e"))
        .transpose()?;
    Ok(EnvFunctions { entry, handler })
}

fn dump(function: &Function, role: &str) -> Result<Vec<u8>, LuaError> {
    let bytes = function.dump(false);
    if bytes.is_empty() {
        return Err(LuaError::Encode(format!(
            "{role} must be a pure Lua function"
        )));
    }
    Ok(bytes)
}

fn load(lua: &Lua, bytes: &[u8], name: &str) -> Result<Function, LuaError> {
    lua.load(bytes)
        .set_name(format!("={name}"))
        .set_mode(ChunkMode::Binary)
        .into_function()
        .map_err(|err| LuaError::Decode(err.to_string()))
}
