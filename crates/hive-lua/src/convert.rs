//! Conversions between Lua values and runtime messages.
//!
//! Messages cross isolated contexts, so every value is rebuilt on the
//! receiving side: scalars and tables by value, channel / process /
//! pool handles by identity. Functions, threads, and foreign userdata
//! have no message representation and are rejected at send time.

use crate::bindings::{LuaChannel, LuaPool, LuaProcess};
use crate::error::LuaError;
use hive_runtime::{Message, MsgValue};
use mlua::{Lua, MultiValue, Value, Variadic};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Converts one Lua value into a message value.
///
/// # Errors
///
/// [`LuaError::TypeError`] for values with no message representation.
pub fn value_from_lua(value: &Value) -> Result<MsgValue, LuaError> {
    match value {
        Value::Nil => Ok(MsgValue::Nil),
        Value::Boolean(b) => Ok(MsgValue::Bool(*b)),
        Value::Integer(i) => Ok(MsgValue::Integer(*i)),
        Value::Number(n) => Ok(MsgValue::Number(*n)),
        // Lossy: message text is UTF-8; raw byte strings belong in a
        // better-typed payload.
        Value::String(s) => Ok(MsgValue::Text(s.to_string_lossy())),
        Value::Table(table) => {
            let len = table.raw_len();
            if len > 0 {
                let mut list = Vec::with_capacity(len);
                for index in 1..=len {
                    let item: Value = table.raw_get(index)?;
                    list.push(value_from_lua(&item)?);
                }
                Ok(MsgValue::List(list))
            } else {
                let mut record = BTreeMap::new();
                for pair in table.clone().pairs::<Value, Value>() {
                    let (key, item) = pair?;
                    let key = match &key {
                        Value::String(s) => s.to_string_lossy(),
                        Value::Integer(i) => i.to_string(),
                        other => {
                            return Err(LuaError::TypeError(format!(
                                "cannot send a table keyed by {} in a message",
                                other.type_name()
                            )))
                        }
                    };
                    record.insert(key, value_from_lua(&item)?);
                }
                Ok(MsgValue::Record(record))
            }
        }
        Value::UserData(ud) => {
            if let Ok(channel) = ud.borrow::<LuaChannel>() {
                Ok(MsgValue::Channel(Arc::clone(&channel.0)))
            } else if let Ok(process) = ud.borrow::<LuaProcess>() {
                Ok(MsgValue::Process(Arc::clone(&process.0)))
            } else if let Ok(pool) = ud.borrow::<LuaPool>() {
                Ok(MsgValue::Pool(Arc::clone(&pool.0)))
            } else {
                Err(LuaError::TypeError(
                    "cannot send foreign userdata in a message".into(),
                ))
            }
        }
        other => Err(LuaError::TypeError(format!(
            "cannot send {} in a message",
            other.type_name()
        ))),
    }
}

/// Rebuilds one message value in `lua`.
///
/// # Errors
///
/// Propagates Lua allocation failures.
pub fn value_into_lua(lua: &Lua, value: &MsgValue) -> mlua::Result<Value> {
    match value {
        MsgValue::Nil => Ok(Value::Nil),
        MsgValue::Bool(b) => Ok(Value::Boolean(*b)),
        MsgValue::Integer(i) => Ok(Value::Integer(*i)),
        MsgValue::Number(n) => Ok(Value::Number(*n)),
        MsgValue::Text(s) => Ok(Value::String(lua.create_string(s)?)),
        MsgValue::List(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (index, item) in items.iter().enumerate() {
                table.raw_set(index + 1, value_into_lua(lua, item)?)?;
            }
            Ok(Value::Table(table))
        }
        MsgValue::Record(entries) => {
            let table = lua.create_table_with_capacity(0, entries.len())?;
            for (key, item) in entries {
                table.raw_set(key.as_str(), value_into_lua(lua, item)?)?;
            }
            Ok(Value::Table(table))
        }
        MsgValue::Channel(channel) => Ok(Value::UserData(
            lua.create_userdata(LuaChannel(Arc::clone(channel)))?,
        )),
        MsgValue::Process(process) => Ok(Value::UserData(
            lua.create_userdata(LuaProcess(Arc::clone(process)))?,
        )),
        MsgValue::Pool(pool) => Ok(Value::UserData(
            lua.create_userdata(LuaPool(Arc::clone(pool)))?,
        )),
    }
}

/// Packs the arguments of one send into one message.
///
/// # Errors
///
/// [`LuaError::TypeError`] if any argument has no message form.
pub fn message_from_args(args: &Variadic<Value>) -> Result<Message, LuaError> {
    args.iter().map(value_from_lua).collect::<Result<_, _>>()
}

/// Unpacks a message into the values a handler receives.
///
/// # Errors
///
/// Propagates Lua allocation failures.
pub fn message_into_multi(lua: &Lua, message: Message) -> mlua::Result<MultiValue> {
    let mut values = Vec::with_capacity(message.len());
    for value in message.values() {
        values.push(value_into_lua(lua, value)?);
    }
    Ok(MultiValue::from_vec(values))
}
