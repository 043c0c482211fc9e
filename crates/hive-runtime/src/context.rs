//! Execution-context boundary.
//!
//! The runtime schedules instances but never interprets user code
//! itself; that is the job of an execution engine behind the
//! [`Context`] trait. A context is the isolated state of one instance,
//! driven as a resumable stepper: the worker feeds it one message at a
//! time and classifies the [`StepOutcome`].
//!
//! # Contract
//!
//! - A context is owned by exactly one instance and stepped by at most
//!   one worker at a time; implementations need `Send`, not `Sync`.
//! - Errors raised by user code are routed to the context's own error
//!   handler slot *inside* the context. The worker only observes
//!   [`StepOutcome::Faulted`] and retires the instance.
//! - [`Context::start`] runs the driver to its first suspension;
//!   [`Context::resume`] delivers one message (`Some`) or a plain
//!   wake-up after a voluntary yield (`None`).

use crate::channel::MessageChannel;
use crate::error::ContextError;
use crate::instance::Instance;
use crate::message::Message;
use std::sync::Arc;

/// Result of driving a context one step.
#[derive(Debug)]
pub enum StepOutcome {
    /// The context wants the next message.
    ///
    /// `source` names the channel it blocked on; `None` means the
    /// owning process's input channel.
    AwaitingMessage {
        /// Explicit wait target, if the context named one.
        source: Option<Arc<MessageChannel>>,
    },

    /// The context yielded voluntarily and is immediately runnable.
    Yielded,

    /// The driver returned; the instance is finished.
    Done,

    /// User code raised an error.
    ///
    /// The context has already run its error handler slot; `handled`
    /// records whether that handler itself completed. Either way the
    /// instance terminates.
    Faulted {
        /// Rendered error message.
        error: String,
        /// Whether the error handler ran to completion.
        handled: bool,
    },
}

/// Isolated execution state of one instance.
pub trait Context: Send {
    /// Runs the driver up to its first suspension point.
    fn start(&mut self) -> StepOutcome;

    /// Resumes the driver with one message, or with nothing after a
    /// voluntary yield.
    fn resume(&mut self, message: Option<Message>) -> StepOutcome;
}

/// Factory building a fresh context for each new instance.
///
/// Implementations perform instance initialization: install the
/// back-reference to `instance` (so nested process creation can
/// discover its parent), load the baseline capability libraries,
/// decode the process environment, and build the driver.
pub trait ContextFactory: Send + Sync {
    /// Builds a context for a newly created instance.
    ///
    /// # Errors
    ///
    /// [`ContextError`] when the engine cannot prepare the context or
    /// decode the process environment.
    fn create(&self, instance: &Arc<Instance>) -> Result<Box<dyn Context>, ContextError>;
}
