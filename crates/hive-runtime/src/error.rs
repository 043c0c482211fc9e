//! Runtime layer errors.
//!
//! One error enum per subsystem, all implementing [`ErrorCode`] for
//! standardized handling at the embedding boundary.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`QueueError::InvalidCapacity`] | `QUEUE_INVALID_CAPACITY` | No |
//! | [`ChannelError::Full`] | `CHANNEL_FULL` | Yes |
//! | [`ChannelError::InvalidCapacity`] | `CHANNEL_INVALID_CAPACITY` | No |
//! | [`PoolError::Spawn`] | `POOL_SPAWN` | No |
//! | [`ProcessError::NotAssociated`] | `PROCESS_NOT_ASSOCIATED` | No |
//! | [`ProcessError::NotWrapped`] | `PROCESS_NOT_WRAPPED` | No |
//! | [`ProcessError::AlreadyWrapped`] | `PROCESS_ALREADY_WRAPPED` | No |
//! | [`ProcessError::HasInstances`] | `PROCESS_HAS_INSTANCES` | Yes |
//! | [`ProcessError::NotFound`] | `PROCESS_NOT_FOUND` | No |
//! | [`ProcessError::Context`] | `PROCESS_CONTEXT` | No |
//! | [`ContextError::Init`] | `CONTEXT_INIT` | No |
//! | [`ContextError::Env`] | `CONTEXT_ENV` | No |
//! | [`RuntimeError::AlreadyInitialized`] | `RUNTIME_ALREADY_INITIALIZED` | No |
//! | [`RuntimeError::NotInitialized`] | `RUNTIME_NOT_INITIALIZED` | No |
//! | [`RuntimeError::InvalidConfig`] | `RUNTIME_INVALID_CONFIG` | No |
//! | [`RuntimeError::Pool`] | `RUNTIME_POOL` | No |

use hive_types::ErrorCode;
use thiserror::Error;

/// Ready-queue errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Capacity must be `-1` (unbounded) or a positive bound.
    #[error("invalid queue capacity: {0} (expected -1 or a positive bound)")]
    InvalidCapacity(i64),
}

impl ErrorCode for QueueError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidCapacity(_) => "QUEUE_INVALID_CAPACITY",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Message channel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A bounded channel rejected a push at its capacity.
    ///
    /// Recoverable: draining the channel makes room.
    #[error("channel is full (capacity {capacity})")]
    Full {
        /// The bound the push ran into.
        capacity: usize,
    },

    /// Capacity must be `-1` (unbounded) or a positive bound.
    #[error("invalid channel capacity: {0} (expected -1 or a positive bound)")]
    InvalidCapacity(i64),
}

impl ErrorCode for ChannelError {
    fn code(&self) -> &'static str {
        match self {
            Self::Full { .. } => "CHANNEL_FULL",
            Self::InvalidCapacity(_) => "CHANNEL_INVALID_CAPACITY",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full { .. })
    }
}

/// Thread pool errors.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl ErrorCode for PoolError {
    fn code(&self) -> &'static str {
        match self {
            Self::Spawn(_) => "POOL_SPAWN",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Process (task) errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Spawn was attempted on a process with no pool binding.
    #[error("process must be associated to a pool")]
    NotAssociated,

    /// Spawn was attempted on a process with no environment.
    ///
    /// Empty processes are legal; give them an environment with `wrap`
    /// before instantiating.
    #[error("process must have an environment")]
    NotWrapped,

    /// `wrap` was invoked on a process that already has an environment.
    ///
    /// A process environment is installed exactly once.
    #[error("process already has an environment")]
    AlreadyWrapped,

    /// `destroy` was rejected because instances are still live.
    ///
    /// Recoverable: `remove` the instances and retry once they drain.
    #[error("process has {live} live instance(s)")]
    HasInstances {
        /// Live instance count at the time of the call.
        live: u32,
    },

    /// No process is registered at the given address.
    #[error("process not found at address {0:#x}")]
    NotFound(usize),

    /// Building an execution context for a new instance failed.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl ErrorCode for ProcessError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotAssociated => "PROCESS_NOT_ASSOCIATED",
            Self::NotWrapped => "PROCESS_NOT_WRAPPED",
            Self::AlreadyWrapped => "PROCESS_ALREADY_WRAPPED",
            Self::HasInstances { .. } => "PROCESS_HAS_INSTANCES",
            Self::NotFound(_) => "PROCESS_NOT_FOUND",
            Self::Context(_) => "PROCESS_CONTEXT",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::HasInstances { .. })
    }
}

/// Execution-context boundary errors.
///
/// Raised by [`ContextFactory`](crate::context::ContextFactory)
/// implementations when a fresh context cannot be prepared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Context creation or library installation failed.
    #[error("context init failed: {0}")]
    Init(String),

    /// The process environment could not be decoded into the context.
    #[error("environment decode failed: {0}")]
    Env(String),
}

impl ErrorCode for ContextError {
    fn code(&self) -> &'static str {
        match self {
            Self::Init(_) => "CONTEXT_INIT",
            Self::Env(_) => "CONTEXT_ENV",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Runtime lifecycle errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// `init` was called while a default pool is already installed.
    #[error("runtime already initialized")]
    AlreadyInitialized,

    /// The default pool was requested before `init`.
    #[error("runtime not initialized")]
    NotInitialized,

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The default pool could not be created.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl ErrorCode for RuntimeError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized => "RUNTIME_ALREADY_INITIALIZED",
            Self::NotInitialized => "RUNTIME_NOT_INITIALIZED",
            Self::InvalidConfig(_) => "RUNTIME_INVALID_CONFIG",
            Self::Pool(_) => "RUNTIME_POOL",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_types::assert_error_codes;

    #[test]
    fn queue_error_codes_valid() {
        assert_error_codes(&[QueueError::InvalidCapacity(0)], "QUEUE_");
    }

    #[test]
    fn channel_error_codes_valid() {
        assert_error_codes(
            &[
                ChannelError::Full { capacity: 8 },
                ChannelError::InvalidCapacity(-7),
            ],
            "CHANNEL_",
        );
    }

    #[test]
    fn pool_error_codes_valid() {
        assert_error_codes(
            &[PoolError::Spawn(std::io::Error::other("no threads"))],
            "POOL_",
        );
    }

    #[test]
    fn process_error_codes_valid() {
        assert_error_codes(
            &[
                ProcessError::NotAssociated,
                ProcessError::NotWrapped,
                ProcessError::AlreadyWrapped,
                ProcessError::HasInstances { live: 2 },
                ProcessError::NotFound(0xdead),
                ProcessError::Context(ContextError::Init("x".into())),
            ],
            "PROCESS_",
        );
    }

    #[test]
    fn runtime_error_codes_valid() {
        assert_error_codes(
            &[
                RuntimeError::AlreadyInitialized,
                RuntimeError::NotInitialized,
                RuntimeError::InvalidConfig("x".into()),
            ],
            "RUNTIME_",
        );
    }

    #[test]
    fn channel_full_is_recoverable() {
        assert!(ChannelError::Full { capacity: 1 }.is_recoverable());
        assert!(!ChannelError::InvalidCapacity(0).is_recoverable());
    }

    #[test]
    fn has_instances_is_recoverable() {
        assert!(ProcessError::HasInstances { live: 1 }.is_recoverable());
        assert!(!ProcessError::AlreadyWrapped.is_recoverable());
    }
}
