//! Lock-free MPMC FIFO with blocking consumers.
//!
//! [`LfQueue`] is the queue behind every pool's ready list. The fast
//! path is a `crossbeam` segmented queue; a mutex/condvar pair exists
//! only to park consumers on empty and producers on a bound. Producers
//! and consumers on the fast path never contend on a lock.
//!
//! # Capacity
//!
//! Capacity follows the runtime-wide convention: `-1` is unbounded,
//! a positive value bounds the queue (push then blocks while full),
//! anything else is [`QueueError::InvalidCapacity`]. Pools use the
//! unbounded form.
//!
//! # Ordering
//!
//! FIFO per producer; across producers, a push that completes before
//! another producer's push begins is observed first. Nothing stronger
//! is needed because scheduling fairness is out of contract.
//!
//! # Example
//!
//! ```
//! use hive_runtime::queue::LfQueue;
//!
//! let q = LfQueue::unbounded();
//! q.push(1);
//! q.push(2);
//! assert_eq!(q.pop(), 1);
//! assert_eq!(q.try_pop(), Some(2));
//! assert_eq!(q.try_pop(), None);
//! ```

use crate::error::QueueError;
use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI64, Ordering};

/// Capacity value meaning "no bound".
pub const UNBOUNDED: i64 = -1;

/// Multi-producer multi-consumer FIFO with a blocking `pop`.
pub struct LfQueue<T> {
    items: SegQueue<T>,
    capacity: AtomicI64,
    /// Parking gate; guards no data, only condvar waits.
    gate: Mutex<()>,
    consumers: Condvar,
    producers: Condvar,
}

impl<T> LfQueue<T> {
    /// Creates an unbounded queue.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            items: SegQueue::new(),
            capacity: AtomicI64::new(UNBOUNDED),
            gate: Mutex::new(()),
            consumers: Condvar::new(),
            producers: Condvar::new(),
        }
    }

    /// Creates a queue with the given capacity (`-1` or positive).
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidCapacity`] for zero or any negative value
    /// other than `-1`.
    pub fn with_capacity(capacity: i64) -> Result<Self, QueueError> {
        let queue = Self::unbounded();
        queue.set_capacity(capacity)?;
        Ok(queue)
    }

    /// Pushes an entry, blocking while a bounded queue is full.
    ///
    /// Unbounded queues never block and never touch the gate on the
    /// way in; bounded producers serialize through it so the bound
    /// holds exactly.
    pub fn push(&self, item: T) {
        if self.capacity.load(Ordering::Acquire) == UNBOUNDED {
            self.items.push(item);
            let _gate = self.gate.lock();
            self.consumers.notify_one();
            return;
        }
        let mut gate = self.gate.lock();
        loop {
            if self.has_room() {
                self.items.push(item);
                self.consumers.notify_one();
                return;
            }
            self.producers.wait(&mut gate);
        }
    }

    /// Pops the next entry, blocking until one is available.
    pub fn pop(&self) -> T {
        loop {
            if let Some(item) = self.items.pop() {
                self.notify_producer();
                return item;
            }
            let mut gate = self.gate.lock();
            match self.items.pop() {
                Some(item) => {
                    self.producers.notify_one();
                    return item;
                }
                None => self.consumers.wait(&mut gate),
            }
        }
    }

    /// Pops the next entry if one is immediately available.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.items.pop();
        if item.is_some() {
            self.notify_producer();
        }
        item
    }

    /// Returns the number of buffered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no entries are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the current capacity (`-1` = unbounded).
    #[must_use]
    pub fn capacity(&self) -> i64 {
        self.capacity.load(Ordering::Acquire)
    }

    /// Replaces the capacity.
    ///
    /// Raising (or removing) the bound releases blocked producers.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidCapacity`] for zero or any negative value
    /// other than `-1`.
    pub fn set_capacity(&self, capacity: i64) -> Result<(), QueueError> {
        if capacity != UNBOUNDED && capacity <= 0 {
            return Err(QueueError::InvalidCapacity(capacity));
        }
        self.capacity.store(capacity, Ordering::Release);
        let _gate = self.gate.lock();
        self.producers.notify_all();
        Ok(())
    }

    fn has_room(&self) -> bool {
        let capacity = self.capacity.load(Ordering::Acquire);
        capacity == UNBOUNDED || (self.items.len() as i64) < capacity
    }

    /// Wakes one producer blocked on a bound. Must not hold the gate.
    fn notify_producer(&self) {
        if self.capacity.load(Ordering::Acquire) != UNBOUNDED {
            let _gate = self.gate.lock();
            self.producers.notify_one();
        }
    }
}

impl<T> Default for LfQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> std::fmt::Debug for LfQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LfQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
