//! `hive.pool`: the thread pool module.
//!
//! ```lua
//! local q = hive.pool.new(2)
//! q:add(1)
//! print(q:size())        --> 3
//! q:kill()               -- one worker exits once idle
//! local same = hive.pool.get(q:ptr())
//! assert(same == q)
//! ```

use hive_runtime::Pool;
use mlua::{Lua, MetaMethod, Table, UserData, UserDataMethods, UserDataRef, Value};
use std::sync::Arc;

/// Userdata wrapping a pool handle.
pub(crate) struct LuaPool(pub(crate) Arc<Pool>);

impl UserData for LuaPool {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("add", |_, this, n: Option<i64>| {
            let n = n.unwrap_or(1);
            if n < 0 {
                return Err(mlua::Error::RuntimeError(
                    "argument must be positive or zero".to_string(),
                ));
            }
            this.0
                .add(n as usize)
                .map_err(mlua::Error::external)?;
            Ok(n)
        });

        methods.add_method("size", |_, this, ()| Ok(this.0.size()));

        methods.add_method("kill", |_, this, ()| {
            this.0.kill();
            Ok(())
        });

        methods.add_method("ptr", |_, this, ()| Ok(this.0.ptr() as i64));

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: UserDataRef<LuaPool>| {
            Ok(Arc::ptr_eq(&this.0, &other.0))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("Pool ({:#x})", this.0.ptr()))
        });
    }
}

/// Installs `hive.pool`.
pub(crate) fn register(lua: &Lua, hive: &Table) -> mlua::Result<()> {
    let module = lua.create_table()?;

    module.set(
        "new",
        lua.create_function(|_, size: Option<i64>| {
            let size = size.unwrap_or(1);
            if size < 0 {
                return Err(mlua::Error::RuntimeError(
                    "Initial pool size must be greater than zero".to_string(),
                ));
            }
            let pool = Pool::new(size as usize).map_err(mlua::Error::external)?;
            Ok(LuaPool(pool))
        })?,
    )?;

    module.set(
        "get",
        lua.create_function(|lua, addr: i64| match Pool::get(addr as usize) {
            Some(pool) => Ok((
                Value::UserData(lua.create_userdata(LuaPool(pool))?),
                Value::Nil,
            )),
            None => Ok((
                Value::Nil,
                Value::String(lua.create_string("Pool is null")?),
            )),
        })?,
    )?;

    hive.set("pool", module)
}
