//! Error types for the Lua engine.

use hive_types::ErrorCode;
use thiserror::Error;

/// Errors raised by the Lua engine and the `hive.*` modules.
#[derive(Debug, Error)]
pub enum LuaError {
    /// Lua runtime error.
    #[error("lua error: {0}")]
    Runtime(#[from] mlua::Error),

    /// A function could not be serialized into an environment.
    #[error("encode failed: {0}")]
    Encode(String),

    /// An environment blob could not be loaded back.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A Lua value has no message representation.
    #[error("type error: {0}")]
    TypeError(String),
}

impl ErrorCode for LuaError {
    fn code(&self) -> &'static str {
        match self {
            Self::Runtime(_) => "LUA_RUNTIME",
            Self::Encode(_) => "LUA_ENCODE",
            Self::Decode(_) => "LUA_DECODE",
            Self::TypeError(_) => "LUA_TYPE_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

impl From<LuaError> for mlua::Error {
    fn from(err: LuaError) -> Self {
        match err {
            LuaError::Runtime(inner) => inner,
            other => mlua::Error::RuntimeError(other.to_string()),
        }
    }
}
