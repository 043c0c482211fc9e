//! Message channel - shared input of a process.
//!
//! A [`MessageChannel`] is a FIFO of [`Message`]s plus a FIFO of
//! parked instances (waiters). All instances of one process consume
//! from the same channel, which is what fans deliveries out across
//! them. One lock covers buffer and waiter list together, so the
//! transition between "parked in the waiter list" and "ready on a
//! pool" is atomic: an instance can never be visible in both.
//!
//! # Delivery
//!
//! A push with parked consumers hands the message directly to exactly
//! one waiter and makes it READY on its process's pool; otherwise the
//! message is buffered. A bounded channel rejects the push at its
//! capacity with [`ChannelError::Full`]; producers do not park.
//!
//! # Example
//!
//! ```
//! use hive_runtime::channel::MessageChannel;
//! use hive_runtime::message::Message;
//!
//! let ch = MessageChannel::unbounded();
//! ch.push(Message::single("hi")).expect("unbounded push");
//! assert_eq!(ch.len(), 1);
//! assert_eq!(ch.try_pop(), Some(Message::single("hi")));
//! ```

use crate::error::ChannelError;
use crate::instance::{Instance, InstanceState};
use crate::message::Message;
use crate::queue::UNBOUNDED;
use crate::registry::AddrRegistry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};
use tracing::warn;

static REGISTRY: LazyLock<AddrRegistry<MessageChannel>> = LazyLock::new(AddrRegistry::new);

struct Inner {
    buf: VecDeque<Message>,
    waiters: VecDeque<Arc<Instance>>,
    capacity: i64,
}

/// FIFO of messages with a waiter list of parked instances.
pub struct MessageChannel {
    inner: Mutex<Inner>,
}

impl MessageChannel {
    fn create(capacity: i64) -> Arc<Self> {
        let channel = Arc::new(Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::new(),
                waiters: VecDeque::new(),
                capacity,
            }),
        });
        REGISTRY.register(&channel);
        channel
    }

    /// Creates an unbounded channel.
    #[must_use]
    pub fn unbounded() -> Arc<Self> {
        Self::create(UNBOUNDED)
    }

    /// Creates a channel with the given capacity (`-1` or positive).
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidCapacity`] for zero or any negative
    /// value other than `-1`.
    pub fn with_capacity(capacity: i64) -> Result<Arc<Self>, ChannelError> {
        if capacity != UNBOUNDED && capacity <= 0 {
            return Err(ChannelError::InvalidCapacity(capacity));
        }
        Ok(Self::create(capacity))
    }

    /// Resolves a channel address to a live handle.
    #[must_use]
    pub fn get(addr: usize) -> Option<Arc<Self>> {
        REGISTRY.get(addr)
    }

    /// Returns the stable address of this channel handle.
    #[must_use]
    pub fn ptr(self: &Arc<Self>) -> usize {
        AddrRegistry::addr_of(self)
    }

    /// Enqueues a message, waking one parked consumer if any.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Full`] when bounded and at capacity.
    pub fn push(&self, message: Message) -> Result<(), ChannelError> {
        let woken = {
            let mut inner = self.inner.lock();
            if let Some(waiter) = inner.waiters.pop_front() {
                waiter.deposit(message);
                waiter.set_parked_on(None);
                waiter.set_state(InstanceState::Ready);
                Some(waiter)
            } else if inner.capacity != UNBOUNDED && inner.buf.len() as i64 >= inner.capacity {
                return Err(ChannelError::Full {
                    capacity: inner.capacity as usize,
                });
            } else {
                inner.buf.push_back(message);
                None
            }
        };
        if let Some(waiter) = woken {
            // Between the lock release above and this enqueue the
            // instance is in no queue at all, which keeps the
            // one-queue invariant.
            match waiter.task().pool() {
                Some(pool) => pool.enqueue_ready(waiter),
                None => warn!(
                    instance = waiter.addr(),
                    "woken instance has no pool binding; it will not run"
                ),
            }
        }
        Ok(())
    }

    /// Worker-side: returns a buffered message or parks `instance` as
    /// a waiter (BLOCKED). Both arms happen under the channel lock.
    pub(crate) fn park_or_take(self: &Arc<Self>, instance: &Arc<Instance>) -> Option<Message> {
        let mut inner = self.inner.lock();
        if let Some(message) = inner.buf.pop_front() {
            instance.set_parked_on(None);
            Some(message)
        } else {
            instance.set_state(InstanceState::Blocked);
            instance.set_parked_on(Some(Arc::clone(self)));
            inner.waiters.push_back(Arc::clone(instance));
            None
        }
    }

    /// Detaches up to `n` parked waiters, leaving them READY but
    /// unqueued; the caller reschedules them. Used by `remove` to
    /// nudge idle instances toward a safe point.
    pub(crate) fn take_waiters(&self, n: usize) -> Vec<Arc<Instance>> {
        let mut inner = self.inner.lock();
        let count = n.min(inner.waiters.len());
        inner
            .waiters
            .drain(..count)
            .map(|waiter| {
                waiter.set_state(InstanceState::Ready);
                waiter
            })
            .collect()
    }

    /// Pops a buffered message without parking. Host-side consumption.
    #[must_use]
    pub fn try_pop(&self) -> Option<Message> {
        self.inner.lock().buf.pop_front()
    }

    /// Returns the number of buffered messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    /// Returns `true` if no messages are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().buf.is_empty()
    }

    /// Returns the number of parked consumers.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Returns the current capacity (`-1` = unbounded).
    #[must_use]
    pub fn capacity(&self) -> i64 {
        self.inner.lock().capacity
    }

    /// Replaces the capacity. Messages already buffered beyond a new
    /// bound stay buffered; only future pushes see the bound.
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidCapacity`] for zero or any negative
    /// value other than `-1`.
    pub fn set_capacity(&self, capacity: i64) -> Result<(), ChannelError> {
        if capacity != UNBOUNDED && capacity <= 0 {
            return Err(ChannelError::InvalidCapacity(capacity));
        }
        self.inner.lock().capacity = capacity;
        Ok(())
    }
}

impl std::fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MessageChannel")
            .field("len", &inner.buf.len())
            .field("waiters", &inner.waiters.len())
            .field("capacity", &inner.capacity)
            .finish()
    }
}

impl std::fmt::Display for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Channel ({:#x})", self as *const Self as usize)
    }
}
