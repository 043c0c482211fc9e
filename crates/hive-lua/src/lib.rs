//! Lua execution engine for the hive runtime.
//!
//! This crate supplies everything `hive-runtime` treats as opaque:
//!
//! | Piece | Here |
//! |-------|------|
//! | Execution context | [`LuaContext`]: one Lua state + driver coroutine per instance |
//! | Context factory | [`LuaContextFactory`] / [`context_factory`] |
//! | Environment codec | [`env::encode`] / [`env::decode`] over binary chunks |
//! | Message conversion | [`convert`]: Lua values <-> runtime messages |
//! | User modules | `hive.process`, `hive.pool`, `hive.channel`, `hive.get`, `hive.log` |
//! | Host environment | [`HostEnv`] for the CLI and embedders |
//!
//! # Instance initialization
//!
//! Building a context for process `P`:
//!
//! 1. Fresh Lua state with the baseline capability libraries (io, os,
//!    table, string, math, debug, coroutine).
//! 2. Instance back-reference installed as app data, so a nested
//!    `hive.process.new` records `P` as the parent.
//! 3. `P`'s environment decoded into `{f, e}`; `e` (or identity)
//!    becomes the context's error handler slot.
//! 4. The driver coroutine is built around `f`; the worker then steps
//!    it one message at a time.

mod bindings;
mod context;
pub mod convert;
pub mod env;
mod error;
mod host;

pub use context::{context_factory, LuaContext, LuaContextFactory};
pub use error::LuaError;
pub use host::HostEnv;
