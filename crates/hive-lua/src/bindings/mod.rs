//! The `hive.*` modules exposed to user code.
//!
//! Every context, instance or host alike, carries one global `hive` table:
//!
//! | Entry | Purpose |
//! |-------|---------|
//! | `hive.process` | `new`, `get`, `destroy`, `isprocess` |
//! | `hive.pool` | `new`, `get` |
//! | `hive.channel` | `new`, `get` |
//! | `hive.get(ch)` | blocking receive (instance contexts only) |
//! | `hive.yield()` | voluntary yield back to the worker |
//! | `hive.log(...)` | structured logging bridge |
//!
//! `hive.get` and `hive.yield` are Lua-side shims over
//! `coroutine.yield`; the yield crosses the handler and reaches the
//! driver boundary, where the worker interprets it. In a host context
//! there is no driver to catch the yield, so both raise the usual
//! "attempt to yield from outside a coroutine".

mod channel;
mod pool;
mod process;

pub(crate) use channel::LuaChannel;
pub(crate) use pool::LuaPool;
pub(crate) use process::LuaProcess;

use crate::error::LuaError;
use mlua::{Function, Lua, Table, Value, Variadic};
use tracing::{debug, error, info, trace, warn};

const HELPERS: &str = r#"
local yield = coroutine.yield
return {
    get = function(ch) return yield(ch) end,
    yield = function() return yield(true) end,
}
"#;

/// Installs the `hive` global into a Lua state.
///
/// # Errors
///
/// Propagates Lua errors from table and function creation.
pub fn register(lua: &Lua) -> Result<(), LuaError> {
    let hive = lua.create_table()?;

    pool::register(lua, &hive)?;
    process::register(lua, &hive)?;
    channel::register(lua, &hive)?;

    hive.set("log", lua.create_function(log)?)?;

    let helpers: Table = lua.load(HELPERS).set_name("=hive.helpers").eval()?;
    hive.set("get", helpers.get::<Function>("get")?)?;
    hive.set("yield", helpers.get::<Function>("yield")?)?;

    lua.globals().set("hive", hive)?;
    Ok(())
}

/// `hive.log([level,] ...)`: forwards to `tracing`.
fn log(_lua: &Lua, args: Variadic<Value>) -> mlua::Result<()> {
    let mut parts: Vec<String> = args.iter().map(display_value).collect();
    let level = if parts.len() > 1 {
        match parts[0].as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Some(parts.remove(0)),
            _ => None,
        }
    } else {
        None
    };
    let line = parts.join("\t");
    match level.as_deref() {
        Some("trace") => trace!(target: "hive::lua", "{line}"),
        Some("debug") => debug!(target: "hive::lua", "{line}"),
        Some("warn") => warn!(target: "hive::lua", "{line}"),
        Some("error") => error!(target: "hive::lua", "{line}"),
        _ => info!(target: "hive::lua", "{line}"),
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.to_string_lossy(),
        other => format!("{}: {other:?}", other.type_name()),
    }
}
