//! Instance - one live executor of a process.
//!
//! An instance owns an isolated execution context and cycles through a
//! small lifecycle driven by pool workers:
//!
//! ```text
//! CREATED ──init──► READY ──dispatched──► RUNNING
//! RUNNING ──waits on channel──► BLOCKED ──message arrives──► READY
//! RUNNING ──voluntary yield──► READY (re-enqueued)
//! RUNNING ──driver returns / error──► DEAD
//! BLOCKED ──remove() harvest──► DEAD
//! ```
//!
//! The handle is shared between the ready queue, a channel's waiter
//! list, and the worker executing it, but the state field keeps those
//! exclusive: an instance is in at most one queue, or running on
//! exactly one worker, never both. Queue transitions happen under the
//! owning channel's lock; the state itself is a single atomic.

use crate::channel::MessageChannel;
use crate::context::Context;
use crate::message::Message;
use crate::process::Process;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of an [`Instance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InstanceState {
    /// Created, context not yet started.
    Created = 0,
    /// Enqueued on a pool's ready queue.
    Ready = 1,
    /// Being stepped by a worker.
    Running = 2,
    /// Parked on a channel's waiter list.
    Blocked = 3,
    /// Terminated; context released.
    Dead = 4,
}

impl InstanceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Ready,
            2 => Self::Running,
            3 => Self::Blocked,
            _ => Self::Dead,
        }
    }
}

/// One executor of a process.
pub struct Instance {
    /// Owning process. Shared: many instances per process.
    task: Arc<Process>,
    state: AtomicU8,
    /// Latch distinguishing the first dispatch (driver start).
    started: AtomicBool,
    /// Set when the context yielded voluntarily and expects a plain
    /// wake-up instead of a message.
    yielded: AtomicBool,
    /// Exclusive execution context; `None` once dead.
    context: Mutex<Option<Box<dyn Context>>>,
    /// Channel this instance is (logically) waiting on.
    chan: Mutex<Option<Arc<MessageChannel>>>,
    /// Message deposited for the next resume.
    pending: Mutex<Option<Message>>,
}

impl Instance {
    /// Creates an instance for `task` and builds its context through
    /// the process's factory.
    pub(crate) fn create(task: Arc<Process>) -> Result<Arc<Self>, crate::error::ContextError> {
        let instance = Arc::new(Self {
            task,
            state: AtomicU8::new(InstanceState::Created as u8),
            started: AtomicBool::new(false),
            yielded: AtomicBool::new(false),
            context: Mutex::new(None),
            chan: Mutex::new(None),
            pending: Mutex::new(None),
        });
        let context = instance.task.factory().create(&instance)?;
        *instance.context.lock() = Some(context);
        Ok(instance)
    }

    /// Returns the owning process.
    #[must_use]
    pub fn task(&self) -> &Arc<Process> {
        &self.task
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> InstanceState {
        InstanceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns the instance address, for logging.
    #[must_use]
    pub fn addr(&self) -> usize {
        self as *const Self as usize
    }

    pub(crate) fn set_state(&self, state: InstanceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Atomically transitions `from -> to`; `false` if the state moved.
    pub(crate) fn transition(&self, from: InstanceState, to: InstanceState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks the first dispatch; returns `true` exactly once.
    pub(crate) fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn set_yield_latch(&self) {
        self.yielded.store(true, Ordering::Release);
    }

    pub(crate) fn take_yield_latch(&self) -> bool {
        self.yielded.swap(false, Ordering::AcqRel)
    }

    /// Deposits the message the next resume will deliver.
    pub(crate) fn deposit(&self, message: Message) {
        *self.pending.lock() = Some(message);
    }

    pub(crate) fn take_pending(&self) -> Option<Message> {
        self.pending.lock().take()
    }

    pub(crate) fn set_parked_on(&self, channel: Option<Arc<MessageChannel>>) {
        *self.chan.lock() = channel;
    }

    /// Returns the channel this instance last parked on.
    pub(crate) fn parked_on(&self) -> Option<Arc<MessageChannel>> {
        self.chan.lock().clone()
    }

    /// Exclusive access to the context for stepping.
    pub(crate) fn context_mut(&self) -> MutexGuard<'_, Option<Box<dyn Context>>> {
        self.context.lock()
    }

    /// Terminal transition: marks DEAD and releases the context.
    pub(crate) fn close(&self) {
        self.set_state(InstanceState::Dead);
        self.chan.lock().take();
        self.pending.lock().take();
        self.context.lock().take();
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("state", &self.state())
            .finish()
    }
}
