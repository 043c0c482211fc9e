//! Lua execution contexts.
//!
//! Each instance owns one [`LuaContext`]: a fresh Lua state carrying
//! the baseline capability libraries, the `hive.*` modules, and a
//! driver coroutine that loops over the process's messages:
//!
//! ```text
//! while true do handler(coroutine.yield()) end
//! ```
//!
//! The yield is the suspension point. The worker resumes the driver
//! with the next message's values; when the driver yields again the
//! worker classifies what it asked for:
//!
//! - a bare yield (no values)      → wait on the process input
//! - a yielded channel handle      → wait on that channel (`hive.get`)
//! - anything else                 → voluntary yield, re-enqueue
//!
//! Errors raised by user code are routed to the context's error
//! handler slot (the environment's `e`, or identity) and terminate
//! the instance.

use crate::bindings::{self, LuaChannel};
use crate::env;
use hive_runtime::{Context, ContextError, ContextFactory, Instance, Message, StepOutcome};
use mlua::{Function, Lua, LuaOptions, MultiValue, StdLib, Thread, ThreadStatus, Value};
use std::sync::{Arc, LazyLock, Weak};
use tracing::debug;

/// Registry key caching the decoded entry function (`env().f`).
pub(crate) const ENTRY_KEY: &str = "hive.env.entry";
/// Registry key holding the installed error handler slot.
pub(crate) const HANDLER_KEY: &str = "hive.env.handler";

/// App-data slot pointing back at the owning instance.
///
/// Installed before anything else runs so that nested `process.new`
/// calls can discover their parent.
pub(crate) struct InstanceSlot(pub(crate) Weak<Instance>);

/// Baseline capability libraries loaded into every context: io, os,
/// table, string, math, debug, package, and the coroutine primitive.
fn baseline_libs() -> StdLib {
    StdLib::COROUTINE
        | StdLib::TABLE
        | StdLib::IO
        | StdLib::OS
        | StdLib::STRING
        | StdLib::MATH
        | StdLib::PACKAGE
        | StdLib::DEBUG
}

/// Creates a Lua state with the baseline libraries.
pub(crate) fn new_baseline_lua() -> Lua {
    // SAFETY: the debug library is part of the baseline capability
    // set every context receives; no C modules are ever loaded and
    // binary chunks come only from `env::encode` dumps.
    unsafe { Lua::unsafe_new_with(baseline_libs(), LuaOptions::default()) }
}

const DRIVER: &str = r"
local handler = ...
local yield = coroutine.yield
while true do
    handler(yield())
end
";

/// Shared factory handle for building [`LuaContext`]s.
pub fn context_factory() -> Arc<LuaContextFactory> {
    static FACTORY: LazyLock<Arc<LuaContextFactory>> =
        LazyLock::new(|| Arc::new(LuaContextFactory));
    Arc::clone(&FACTORY)
}

/// Builds a [`LuaContext`] per instance.
#[derive(Debug, Default)]
pub struct LuaContextFactory;

impl ContextFactory for LuaContextFactory {
    fn create(&self, instance: &Arc<Instance>) -> Result<Box<dyn Context>, ContextError> {
        let lua = new_baseline_lua();
        lua.set_app_data(InstanceSlot(Arc::downgrade(instance)));
        bindings::register(&lua).map_err(|err| ContextError::Init(err.to_string()))?;

        let blob = instance
            .task()
            .env_blob()
            .ok_or_else(|| ContextError::Env("process has no environment".to_string()))?;
        let functions =
            env::decode(&lua, &blob).map_err(|err| ContextError::Env(err.to_string()))?;
        let handler = match functions.handler {
            Some(handler) => handler,
            None => identity_handler(&lua).map_err(init_err)?,
        };

        lua.set_named_registry_value(ENTRY_KEY, functions.entry.clone())
            .map_err(init_err)?;
        lua.set_named_registry_value(HANDLER_KEY, handler.clone())
            .map_err(init_err)?;

        let driver_fn = lua
            .load(DRIVER)
            .set_name("=driver")
            .into_function()
            .map_err(init_err)?;
        let driver = lua.create_thread(driver_fn).map_err(init_err)?;

        Ok(Box::new(LuaContext {
            lua,
            driver,
            entry: Some(functions.entry),
            handler,
        }))
    }
}

fn init_err(err: mlua::Error) -> ContextError {
    ContextError::Init(err.to_string())
}

fn identity_handler(lua: &Lua) -> mlua::Result<Function> {
    lua.load("return function(e) return e end")
        .set_name("=identity")
        .eval()
}

/// One instance's isolated Lua state plus its driver coroutine.
pub struct LuaContext {
    lua: Lua,
    driver: Thread,
    /// Entry function, consumed by the first resume.
    entry: Option<Function>,
    /// Error handler slot: the environment's `e`, or identity.
    handler: Function,
}

impl LuaContext {
    fn step(&mut self, args: MultiValue) -> StepOutcome {
        match self.driver.resume::<MultiValue>(args) {
            Ok(yielded) => match self.driver.status() {
                ThreadStatus::Resumable => classify_yield(&yielded),
                _ => StepOutcome::Done,
            },
            Err(err) => self.fault(&err),
        }
    }

    /// Routes a raised error to the handler slot, then reports the
    /// terminal outcome.
    fn fault(&mut self, err: &mlua::Error) -> StepOutcome {
        let rendered = flatten_lua_error(err);
        let handled = match self.handler.call::<Value>(rendered.as_str()) {
            Ok(_) => true,
            Err(handler_err) => {
                debug!(error = %handler_err, "error handler itself failed");
                false
            }
        };
        StepOutcome::Faulted {
            error: rendered,
            handled,
        }
    }
}

impl Context for LuaContext {
    fn start(&mut self) -> StepOutcome {
        let Some(entry) = self.entry.take() else {
            return StepOutcome::Faulted {
                error: "driver started twice".to_string(),
                handled: false,
            };
        };
        let args = MultiValue::from_vec(vec![Value::Function(entry)]);
        self.step(args)
    }

    fn resume(&mut self, message: Option<Message>) -> StepOutcome {
        let args = match message {
            Some(message) => match crate::convert::message_into_multi(&self.lua, message) {
                Ok(args) => args,
                Err(err) => return self.fault(&err),
            },
            None => MultiValue::new(),
        };
        self.step(args)
    }
}

/// Maps the values a driver yielded to the wait they represent.
fn classify_yield(yielded: &MultiValue) -> StepOutcome {
    let Some(first) = yielded.iter().next() else {
        // The driver's own message wait.
        return StepOutcome::AwaitingMessage { source: None };
    };
    if let Value::UserData(ud) = first {
        if let Ok(channel) = ud.borrow::<LuaChannel>() {
            return StepOutcome::AwaitingMessage {
                source: Some(Arc::clone(&channel.0)),
            };
        }
    }
    StepOutcome::Yielded
}

/// Renders an mlua error chain as the user-visible message.
fn flatten_lua_error(err: &mlua::Error) -> String {
    match err {
        mlua::Error::RuntimeError(message) => message.clone(),
        mlua::Error::CallbackError { cause, .. } => flatten_lua_error(cause),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_libs_present() {
        let lua = new_baseline_lua();
        for lib in ["io", "os", "table", "string", "math", "debug", "coroutine"] {
            let type_name: String = lua
                .load(format!("return type({lib})"))
                .eval()
                .expect("type query");
            assert_eq!(type_name, "table", "{lib} missing from baseline");
        }
    }

    #[test]
    fn flatten_unwraps_callback_chain() {
        let inner = mlua::Error::RuntimeError("boom".into());
        let outer = mlua::Error::CallbackError {
            traceback: String::new(),
            cause: Arc::new(inner),
        };
        assert_eq!(flatten_lua_error(&outer), "boom");
    }
}
