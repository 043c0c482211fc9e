//! `hive.process`: the process module.
//!
//! ```lua
//! -- spawn four instances sharing one input channel
//! local p = hive.process.new(function(out, v) out:put(v * 2) end, nil, 4)
//!
//! local out = hive.channel.new()
//! p(out, 21)                        -- call syntax sends one message
//! ```
//!
//! A process created with no arguments is empty: it has no
//! environment and spawns nothing until `wrap` completes it. Creation
//! from inside a handler records the creating process, so the new
//! process's `parent()` resolves to it.

use crate::bindings::{LuaChannel, LuaPool};
use crate::context::{context_factory, InstanceSlot, ENTRY_KEY};
use crate::convert;
use crate::env;
use hive_runtime::{ContextFactory, Process, ProcessError};
use mlua::{
    AnyUserData, Function, Lua, MetaMethod, Table, UserData, UserDataMethods, UserDataRef, Value,
    Variadic,
};
use std::sync::Arc;

/// Userdata wrapping a process handle.
pub(crate) struct LuaProcess(pub(crate) Arc<Process>);

/// The process whose instance is executing this context, if any.
fn current_process(lua: &Lua) -> Option<Arc<Process>> {
    let slot = lua.app_data_ref::<InstanceSlot>()?;
    let instance = slot.0.upgrade()?;
    Some(Arc::clone(instance.task()))
}

fn process_err(err: ProcessError) -> mlua::Error {
    mlua::Error::RuntimeError(err.to_string())
}

fn positive(n: i64) -> mlua::Result<u32> {
    if n < 0 {
        return Err(mlua::Error::RuntimeError(
            "argument must be positive or zero".to_string(),
        ));
    }
    Ok(n as u32)
}

/// Parses `new(f?, e?, n?)` the way the classic API does: the error
/// function and the replica count are both optional, and the count
/// may sit in either slot.
fn parse_new_args(args: &Variadic<Value>) -> mlua::Result<(Function, Option<Function>, u32)> {
    let entry = match args.first() {
        Some(Value::Function(f)) => f.clone(),
        other => {
            return Err(mlua::Error::RuntimeError(format!(
                "bad argument #1 to 'new' (function expected, got {})",
                other.map_or("no value", Value::type_name)
            )))
        }
    };
    let handler = match args.get(1) {
        Some(Value::Function(f)) => Some(f.clone()),
        _ => None,
    };
    // The count sits in whichever of the two optional slots holds a
    // number first.
    let replicas = [args.get(1), args.get(2)]
        .into_iter()
        .find_map(|slot| match slot {
            Some(Value::Integer(n)) => Some(*n),
            Some(Value::Number(n)) => Some(*n as i64),
            _ => None,
        })
        .unwrap_or(1);
    Ok((entry, handler, positive(replicas)?))
}

impl UserData for LuaProcess {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_function(
            "wrap",
            |_, (ud, entry, handler): (AnyUserData, Function, Option<Function>)| {
                let blob = env::encode(&entry, handler.as_ref()).map_err(mlua::Error::from)?;
                ud.borrow::<LuaProcess>()?.0.wrap(blob).map_err(process_err)?;
                Ok(ud)
            },
        );

        methods.add_function("spawn", |_, (ud, n): (AnyUserData, Option<i64>)| {
            let n = positive(n.unwrap_or(0))?;
            ud.borrow::<LuaProcess>()?.0.spawn(n).map_err(process_err)?;
            Ok(ud)
        });

        methods.add_function("remove", |_, (ud, n): (AnyUserData, Option<i64>)| {
            let n = positive(n.unwrap_or(0))?;
            ud.borrow::<LuaProcess>()?.0.remove(n);
            Ok(ud)
        });

        methods.add_method("size", |_, this, ()| Ok(this.0.size()));

        methods.add_method("input", |_, this, ()| Ok(LuaChannel(this.0.input())));

        methods.add_function(
            "setinput",
            |_, (ud, channel): (AnyUserData, UserDataRef<LuaChannel>)| {
                ud.borrow::<LuaProcess>()?.0.set_input(Arc::clone(&channel.0));
                Ok(ud)
            },
        );

        // Arity-overloaded: `p:pool()` reads, `p:pool(q)` rebinds.
        methods.add_function("pool", |lua, (ud, args): (AnyUserData, Variadic<Value>)| {
            match args.len() {
                0 => match ud.borrow::<LuaProcess>()?.0.pool() {
                    Some(pool) => Ok(Value::UserData(lua.create_userdata(LuaPool(pool))?)),
                    None => Ok(Value::Nil),
                },
                1 => {
                    let Some(Value::UserData(pool_ud)) = args.first() else {
                        return Err(mlua::Error::RuntimeError("Pool expected".to_string()));
                    };
                    let pool = pool_ud.borrow::<LuaPool>()?;
                    ud.borrow::<LuaProcess>()?.0.set_pool(Arc::clone(&pool.0));
                    Ok(Value::UserData(ud))
                }
                _ => Err(mlua::Error::RuntimeError(
                    "too many arguments".to_string(),
                )),
            }
        });

        methods.add_function(
            "setpool",
            |_, (ud, pool): (AnyUserData, UserDataRef<LuaPool>)| {
                ud.borrow::<LuaProcess>()?.0.set_pool(Arc::clone(&pool.0));
                Ok(ud)
            },
        );

        methods.add_method("parent", |_, this, ()| {
            Ok(this.0.parent().map(LuaProcess))
        });

        methods.add_method("env", |lua, this, ()| {
            // Inside an instance of this very process the decoded
            // entry function is cached context-locally.
            if let Some(slot) = lua.app_data_ref::<InstanceSlot>() {
                if let Some(instance) = slot.0.upgrade() {
                    if Arc::ptr_eq(instance.task(), &this.0) {
                        let cached: Function = lua.named_registry_value(ENTRY_KEY)?;
                        return Ok(Value::Function(cached));
                    }
                }
            }
            match this.0.env_blob() {
                Some(blob) => {
                    let functions = env::decode(lua, &blob).map_err(mlua::Error::from)?;
                    Ok(Value::Function(functions.entry))
                }
                None => Ok(Value::Nil),
            }
        });

        methods.add_method("ptr", |_, this, ()| Ok(this.0.ptr() as i64));
        methods.add_method("__id", |_, this, ()| Ok(this.0.ptr() as i64));

        // Call syntax: the arguments of one call travel as one message.
        methods.add_meta_function(
            MetaMethod::Call,
            |_, (ud, args): (AnyUserData, Variadic<Value>)| {
                let message = convert::message_from_args(&args).map_err(mlua::Error::from)?;
                ud.borrow::<LuaProcess>()?
                    .0
                    .send(message)
                    .map_err(mlua::Error::external)?;
                Ok(ud)
            },
        );

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: UserDataRef<LuaProcess>| {
            Ok(Arc::ptr_eq(&this.0, &other.0))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("Process ({:#x})", this.0.ptr()))
        });
    }
}

/// Installs `hive.process`.
pub(crate) fn register(lua: &Lua, hive: &Table) -> mlua::Result<()> {
    let module = lua.create_table()?;

    module.set(
        "new",
        lua.create_function(|lua, args: Variadic<Value>| {
            let factory: Arc<dyn ContextFactory> = context_factory();
            let mut builder = Process::builder(factory);
            if let Some(parent) = current_process(lua) {
                builder = builder.parent(&parent);
            }
            if args.is_empty() {
                // Empty process: no environment, no instances yet.
                let process = builder.build().map_err(process_err)?;
                return Ok(LuaProcess(process));
            }
            let (entry, handler, replicas) = parse_new_args(&args)?;
            let blob = env::encode(&entry, handler.as_ref()).map_err(mlua::Error::from)?;
            let process = builder
                .env(blob)
                .replicas(replicas)
                .build()
                .map_err(process_err)?;
            Ok(LuaProcess(process))
        })?,
    )?;

    module.set(
        "get",
        lua.create_function(|lua, addr: i64| match Process::get(addr as usize) {
            Some(process) => Ok((
                Value::UserData(lua.create_userdata(LuaProcess(process))?),
                Value::Nil,
            )),
            None => Ok((
                Value::Nil,
                Value::String(lua.create_string("Process not found")?),
            )),
        })?,
    )?;

    module.set(
        "destroy",
        lua.create_function(|_, process: UserDataRef<LuaProcess>| {
            process.0.destroy().map_err(process_err)
        })?,
    )?;

    module.set(
        "isprocess",
        lua.create_function(|_, value: Value| {
            Ok(matches!(&value, Value::UserData(ud) if ud.is::<LuaProcess>()))
        })?,
    )?;

    hive.set("process", module)
}
