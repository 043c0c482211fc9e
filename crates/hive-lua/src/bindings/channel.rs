//! `hive.channel`: the message channel module.
//!
//! ```lua
//! local ch = hive.channel.new()       -- unbounded
//! ch:put("job", 1)                    -- one message, two values
//! print(ch:size())                    --> 1
//!
//! -- inside a process handler:
//! local job, n = hive.get(ch)         -- parks the instance
//! ```
//!
//! `put` returns `true`, or `nil, "Channel is full"` on a bounded
//! channel at capacity.

use crate::convert;
use hive_runtime::{ChannelError, MessageChannel};
use mlua::{Lua, MetaMethod, MultiValue, Table, UserData, UserDataMethods, UserDataRef, Value, Variadic};
use std::sync::Arc;

/// Userdata wrapping a channel handle.
pub(crate) struct LuaChannel(pub(crate) Arc<MessageChannel>);

fn put(lua: &Lua, channel: &Arc<MessageChannel>, args: &Variadic<Value>) -> mlua::Result<(Value, Value)> {
    let message = convert::message_from_args(args).map_err(mlua::Error::from)?;
    match channel.push(message) {
        Ok(()) => Ok((Value::Boolean(true), Value::Nil)),
        Err(ChannelError::Full { .. }) => Ok((
            Value::Nil,
            Value::String(lua.create_string("Channel is full")?),
        )),
        Err(other) => Err(mlua::Error::external(other)),
    }
}

impl UserData for LuaChannel {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("put", |lua, this, args: Variadic<Value>| {
            put(lua, &this.0, &args)
        });

        // Alias kept for symmetry with the runtime API.
        methods.add_method("push", |lua, this, args: Variadic<Value>| {
            put(lua, &this.0, &args)
        });

        methods.add_method("try_get", |lua, this, ()| match this.0.try_pop() {
            Some(message) => convert::message_into_multi(lua, message),
            None => Ok(MultiValue::from_vec(vec![Value::Nil])),
        });

        methods.add_method("set_capacity", |_, this, capacity: i64| {
            this.0
                .set_capacity(capacity)
                .map_err(mlua::Error::external)
        });

        methods.add_method("capacity", |_, this, ()| Ok(this.0.capacity()));

        methods.add_method("size", |_, this, ()| Ok(this.0.len()));

        methods.add_method("ptr", |_, this, ()| Ok(this.0.ptr() as i64));

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: UserDataRef<LuaChannel>| {
            Ok(Arc::ptr_eq(&this.0, &other.0))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("Channel ({:#x})", this.0.ptr()))
        });
    }
}

/// Installs `hive.channel`.
pub(crate) fn register(lua: &Lua, hive: &Table) -> mlua::Result<()> {
    let module = lua.create_table()?;

    module.set(
        "new",
        lua.create_function(|_, capacity: Option<i64>| {
            let channel = match capacity {
                None => MessageChannel::unbounded(),
                Some(capacity) => {
                    MessageChannel::with_capacity(capacity).map_err(mlua::Error::external)?
                }
            };
            Ok(LuaChannel(channel))
        })?,
    )?;

    module.set(
        "get",
        lua.create_function(|lua, addr: i64| match MessageChannel::get(addr as usize) {
            Some(channel) => Ok((
                Value::UserData(lua.create_userdata(LuaChannel(channel))?),
                Value::Nil,
            )),
            None => Ok((
                Value::Nil,
                Value::String(lua.create_string("Channel not found")?),
            )),
        })?,
    )?;

    hive.set("channel", module)
}
