//! Thread pool.
//!
//! Instances share OS threads from a dynamic pool cooperatively.
//! Workers can be added at any time; destruction is deferred: `kill`
//! pushes a null sentinel onto the ready queue, and whichever worker
//! pops it exits. A worker therefore never dies while holding work.
//!
//! # Accounting
//!
//! `size` records *intended* growth: it rises with every `add` and is
//! not decremented by `kill` (the sentinel protocol preserved from the
//! original design; see DESIGN.md). [`Pool::live`] reports the actual
//! number of workers currently in their loop, which after a sequence
//! `new(k); add(m); kill() x j` converges to `k + m - min(j, k + m)`.
//!
//! # Example
//!
//! ```
//! use hive_runtime::pool::Pool;
//!
//! let pool = Pool::new(0).expect("empty pool");
//! assert_eq!(pool.size(), 0);
//! pool.add(2).expect("grow");
//! assert_eq!(pool.size(), 2);
//! pool.kill();
//! pool.shutdown();
//! ```

use crate::error::PoolError;
use crate::instance::{Instance, InstanceState};
use crate::queue::LfQueue;
use crate::registry::AddrRegistry;
use crate::worker;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::thread::JoinHandle;
use tracing::{debug, info};

static REGISTRY: LazyLock<AddrRegistry<Pool>> = LazyLock::new(AddrRegistry::new);

/// Entry on a pool's ready queue.
///
/// `Exit` is the null sentinel: whichever worker pops it terminates.
pub enum ReadyEntry {
    /// An instance ready to be stepped.
    Run(Arc<Instance>),
    /// Exit signal for one worker.
    Exit,
}

struct PoolState {
    /// Intended size: total workers requested via `add`.
    size: u64,
    /// Monotonic counter naming spawned workers.
    spawned: u64,
    workers: Vec<JoinHandle<()>>,
}

/// A dynamic set of worker threads drawing from one ready queue.
pub struct Pool {
    ready: LfQueue<ReadyEntry>,
    /// The pool lock: guards `size` and worker bookkeeping, not the
    /// ready queue itself.
    state: Mutex<PoolState>,
    /// Workers currently inside their loop.
    active: AtomicUsize,
}

impl Pool {
    /// Creates a pool and starts `initial` workers.
    ///
    /// `initial` may be zero: the pool exists, accepts work, and runs
    /// nothing until `add` is called.
    ///
    /// # Errors
    ///
    /// [`PoolError::Spawn`] if the OS refuses a worker thread.
    pub fn new(initial: usize) -> Result<Arc<Self>, PoolError> {
        let pool = Arc::new(Self {
            ready: LfQueue::unbounded(),
            state: Mutex::new(PoolState {
                size: 0,
                spawned: 0,
                workers: Vec::new(),
            }),
            active: AtomicUsize::new(0),
        });
        REGISTRY.register(&pool);
        pool.add(initial)?;
        Ok(pool)
    }

    /// Resolves a pool address to a live handle.
    #[must_use]
    pub fn get(addr: usize) -> Option<Arc<Self>> {
        REGISTRY.get(addr)
    }

    /// Returns the stable address of this pool handle.
    #[must_use]
    pub fn ptr(self: &Arc<Self>) -> usize {
        AddrRegistry::addr_of(self)
    }

    /// Starts `n` new workers and grows `size` by `n`.
    ///
    /// New workers begin polling the ready queue immediately.
    ///
    /// # Errors
    ///
    /// [`PoolError::Spawn`] if a thread cannot be started; workers
    /// spawned before the failure keep running and are counted.
    pub fn add(self: &Arc<Self>, n: usize) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        for _ in 0..n {
            let id = state.spawned;
            let handle = worker::spawn(self, id)?;
            state.workers.push(handle);
            state.spawned += 1;
            state.size += 1;
        }
        debug!(pool = self.ptr(), added = n, size = state.size, "pool grew");
        Ok(())
    }

    /// Schedules one worker for destruction.
    ///
    /// Pushes the exit sentinel; the next worker to pop it terminates.
    /// Work already queued ahead of the sentinel is drained first, so
    /// a worker only dies once it would otherwise go idle. `size` is
    /// not decremented.
    pub fn kill(&self) {
        self.ready.push(ReadyEntry::Exit);
    }

    /// Returns the intended pool size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Returns the number of workers currently running their loop.
    #[must_use]
    pub fn live(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Drains and joins every worker.
    ///
    /// Pushes one sentinel per spawned worker (queued work ahead of
    /// the sentinels still runs), then joins them all. Extra sentinels
    /// left over from prior `kill` calls are harmless.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        for _ in 0..state.workers.len() {
            self.ready.push(ReadyEntry::Exit);
        }
        for handle in state.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker panicked before join");
            }
        }
        info!(pool = self as *const Self as usize, "pool drained");
    }

    /// Makes an instance READY and enqueues it.
    pub(crate) fn enqueue_ready(&self, instance: Arc<Instance>) {
        instance.set_state(InstanceState::Ready);
        self.ready.push(ReadyEntry::Run(instance));
    }

    pub(crate) fn ready_queue(&self) -> &LfQueue<ReadyEntry> {
        &self.ready
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("size", &self.size())
            .field("live", &self.live())
            .field("queued", &self.ready.len())
            .finish()
    }
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pool ({:#x})", self as *const Self as usize)
    }
}

pub(crate) use accounting::WorkerGuard;

mod accounting {
    use super::Pool;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    /// RAII guard keeping [`Pool::live`] accurate even if a worker
    /// unwinds out of its loop.
    pub(crate) struct WorkerGuard {
        pool: Arc<Pool>,
    }

    impl WorkerGuard {
        pub(crate) fn enter(pool: Arc<Pool>) -> Self {
            pool.active.fetch_add(1, Ordering::AcqRel);
            Self { pool }
        }

        pub(crate) fn pool(&self) -> &Arc<Pool> {
            &self.pool
        }
    }

    impl Drop for WorkerGuard {
        fn drop(&mut self) {
            self.pool.active.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn empty_pool_is_legal() {
        let pool = Pool::new(0).expect("pool");
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn add_grows_size_monotonically() {
        let pool = Pool::new(1).expect("pool");
        pool.add(2).expect("add");
        assert_eq!(pool.size(), 3);
        wait_until(|| pool.live() == 3);
        pool.shutdown();
    }

    #[test]
    fn kill_does_not_decrement_size() {
        let pool = Pool::new(2).expect("pool");
        wait_until(|| pool.live() == 2);
        pool.kill();
        wait_until(|| pool.live() == 1);
        assert_eq!(pool.size(), 2, "size records intended growth only");
        pool.shutdown();
    }

    #[test]
    fn worker_accounting_converges() {
        // new(k); add(m); kill() x j  =>  live == k + m - min(j, k + m)
        let pool = Pool::new(1).expect("pool");
        pool.add(2).expect("add");
        wait_until(|| pool.live() == 3);
        pool.kill();
        pool.kill();
        wait_until(|| pool.live() == 1);
        pool.shutdown();
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn surplus_kills_are_harmless() {
        let pool = Pool::new(1).expect("pool");
        pool.kill();
        pool.kill();
        pool.kill();
        wait_until(|| pool.live() == 0);
        // A later worker would consume a leftover sentinel; shutdown
        // with none alive must still return.
        pool.shutdown();
    }

    #[test]
    fn ptr_identity_roundtrip() {
        let a = Pool::new(0).expect("pool");
        let addr = a.ptr();
        let b = Pool::get(addr).expect("registered");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Pool::get(addr + 1).is_none());
    }

    #[test]
    fn display_format() {
        let pool = Pool::new(0).expect("pool");
        assert!(format!("{pool}").starts_with("Pool (0x"));
    }
}
