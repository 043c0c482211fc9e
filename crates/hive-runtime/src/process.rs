//! Process (task) - template for execution.
//!
//! A process bundles a serialized environment (entry function plus
//! optional error handler), a shared input channel, a pool binding,
//! and a weak link to the process that created it. Instantiating the
//! template produces [`Instance`]s; all instances of one process
//! consume the same input channel.
//!
//! # Environment
//!
//! The environment is installed at most once, either at construction
//! or later via [`Process::wrap`], and never replaced (`env == None`
//! processes are legal but cannot be instantiated). The runtime treats
//! the blob as opaque; only the execution engine encodes and decodes
//! it.
//!
//! # Instance accounting
//!
//! `instances` counts live executors under the process's own mutex.
//! [`Process::remove`] decrements the count immediately and leaves
//! harvest tickets behind; surplus instances terminate at their next
//! safe point, idle ones after a nudge off the input channel. Which
//! specific instances die is implementation-defined.

use crate::channel::MessageChannel;
use crate::context::ContextFactory;
use crate::error::{ChannelError, ProcessError};
use crate::instance::Instance;
use crate::message::Message;
use crate::pool::Pool;
use crate::registry::AddrRegistry;
use crate::runtime;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, LazyLock, Weak};
use tracing::debug;

static REGISTRY: LazyLock<AddrRegistry<Process>> = LazyLock::new(AddrRegistry::new);

/// Opaque serialized process environment.
///
/// Produced by the execution engine's `encode` and consumed by its
/// `decode`; the runtime only stores and clones it. `entry` is the
/// serialized entry function, `handler` the optional error handler.
#[derive(Debug, Clone)]
pub struct EnvBlob {
    entry: Box<[u8]>,
    handler: Option<Box<[u8]>>,
}

impl EnvBlob {
    /// Wraps serialized entry and handler bytes.
    #[must_use]
    pub fn new(entry: Vec<u8>, handler: Option<Vec<u8>>) -> Self {
        Self {
            entry: entry.into_boxed_slice(),
            handler: handler.map(Vec::into_boxed_slice),
        }
    }

    /// Serialized entry function.
    #[must_use]
    pub fn entry(&self) -> &[u8] {
        &self.entry
    }

    /// Serialized error handler, if one was provided.
    #[must_use]
    pub fn handler(&self) -> Option<&[u8]> {
        self.handler.as_deref()
    }

    /// Total serialized length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entry.len() + self.handler.as_ref().map_or(0, |h| h.len())
    }

    /// Returns `true` for a zero-length environment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Counters {
    /// Live (not-yet-dead) instances, modulo pending harvest drain.
    live: u32,
    /// Instances that must self-terminate at their next safe point.
    harvest: u32,
}

/// Template for execution: environment + shared input + pool binding.
pub struct Process {
    env: RwLock<Option<EnvBlob>>,
    input: RwLock<Arc<MessageChannel>>,
    pool: RwLock<Option<Arc<Pool>>>,
    /// Creating process, if any. Weak: a dangling parent resolves to
    /// "no parent", never blocks the child.
    parent: Option<Weak<Process>>,
    factory: Arc<dyn ContextFactory>,
    /// The instances mutex.
    counters: Mutex<Counters>,
}

impl Process {
    /// Starts building a process with the given context factory.
    #[must_use]
    pub fn builder(factory: Arc<dyn ContextFactory>) -> ProcessBuilder {
        ProcessBuilder {
            factory,
            env: None,
            pool: None,
            parent: None,
            replicas: 1,
        }
    }

    /// Resolves a process address to a live handle.
    #[must_use]
    pub fn get(addr: usize) -> Option<Arc<Self>> {
        REGISTRY.get(addr)
    }

    /// Like [`Process::get`], with [`ProcessError::NotFound`] for
    /// callers that want an error value.
    pub fn lookup(addr: usize) -> Result<Arc<Self>, ProcessError> {
        Self::get(addr).ok_or(ProcessError::NotFound(addr))
    }

    /// Returns the stable address of this process handle.
    #[must_use]
    pub fn ptr(self: &Arc<Self>) -> usize {
        AddrRegistry::addr_of(self)
    }

    /// Installs the environment on an empty process and spawns one
    /// instance.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::AlreadyWrapped`] if an environment is set.
    /// - Any [`Process::spawn`] failure.
    pub fn wrap(self: &Arc<Self>, env: EnvBlob) -> Result<(), ProcessError> {
        {
            let mut slot = self.env.write();
            if slot.is_some() {
                return Err(ProcessError::AlreadyWrapped);
            }
            *slot = Some(env);
        }
        self.spawn(1)
    }

    /// Creates `n` fresh instances of this process.
    ///
    /// Each instance gets its own execution context and is enqueued
    /// READY on the bound pool. `n == 0` is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::NotAssociated`] without a pool binding.
    /// - [`ProcessError::NotWrapped`] without an environment.
    /// - [`ProcessError::Context`] if the engine rejects a context.
    pub fn spawn(self: &Arc<Self>, n: u32) -> Result<(), ProcessError> {
        let pool = self.pool().ok_or(ProcessError::NotAssociated)?;
        if self.env.read().is_none() {
            return Err(ProcessError::NotWrapped);
        }
        if n == 0 {
            return Ok(());
        }

        let mut counters = self.counters.lock();
        for _ in 0..n {
            let instance = Instance::create(Arc::clone(self))?;
            counters.live += 1;
            pool.enqueue_ready(instance);
        }
        debug!(
            process = self.ptr(),
            spawned = n,
            live = counters.live,
            "instances spawned"
        );
        Ok(())
    }

    /// Schedules up to `n` instances for removal, clamping at zero.
    ///
    /// The live count drops immediately; actual termination is
    /// eventual. Idle instances parked on the input channel are
    /// nudged so they observe the pending removal; running ones
    /// terminate at their next safe point. Returns how many removals
    /// were scheduled.
    pub fn remove(self: &Arc<Self>, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let clamped = {
            let mut counters = self.counters.lock();
            let clamped = n.min(counters.live);
            counters.live -= clamped;
            counters.harvest += clamped;
            clamped
        };
        if clamped > 0 {
            let waiters = self.input().take_waiters(clamped as usize);
            if let Some(pool) = self.pool() {
                for waiter in waiters {
                    pool.enqueue_ready(waiter);
                }
            }
            debug!(
                process = self.ptr(),
                scheduled = clamped,
                "instance removal scheduled"
            );
        }
        clamped
    }

    /// Destroys the process.
    ///
    /// Rejected while instances are live; `remove` them first and let
    /// the drain finish. On success the environment is released and
    /// the address unregistered, so `get(ptr)` reports not-found.
    ///
    /// # Errors
    ///
    /// [`ProcessError::HasInstances`] while `size() > 0`.
    pub fn destroy(self: &Arc<Self>) -> Result<(), ProcessError> {
        let live = self.counters.lock().live;
        if live > 0 {
            return Err(ProcessError::HasInstances { live });
        }
        *self.env.write() = None;
        REGISTRY.unregister(self.ptr());
        Ok(())
    }

    /// Sends one message to the current input channel.
    ///
    /// This is the call-syntax operation: the arguments of one call
    /// travel as one message.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Full`] if the input is bounded and full.
    pub fn send(&self, message: Message) -> Result<(), ChannelError> {
        self.input().push(message)
    }

    /// Returns the live instance count.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.counters.lock().live
    }

    /// Returns the shared input channel.
    #[must_use]
    pub fn input(&self) -> Arc<MessageChannel> {
        Arc::clone(&self.input.read())
    }

    /// Replaces the input channel.
    ///
    /// Only safe while no instance is parked on the old channel; the
    /// runtime does not enforce this, it is the caller's duty.
    pub fn set_input(&self, channel: Arc<MessageChannel>) {
        *self.input.write() = channel;
    }

    /// Returns the bound pool, if any.
    #[must_use]
    pub fn pool(&self) -> Option<Arc<Pool>> {
        self.pool.read().clone()
    }

    /// Rebinds the pool. New instances go to the new pool; in-flight
    /// instances finish wherever they were picked up.
    pub fn set_pool(&self, pool: Arc<Pool>) {
        *self.pool.write() = Some(pool);
    }

    /// Resolves the parent process, or `None` for roots and dangling
    /// parents.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Process>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Returns a copy of the environment blob, if wrapped.
    #[must_use]
    pub fn env_blob(&self) -> Option<EnvBlob> {
        self.env.read().clone()
    }

    pub(crate) fn factory(&self) -> &Arc<dyn ContextFactory> {
        &self.factory
    }

    /// Consumes one harvest ticket if any are pending.
    pub(crate) fn consume_harvest_ticket(&self) -> bool {
        let mut counters = self.counters.lock();
        if counters.harvest > 0 {
            counters.harvest -= 1;
            true
        } else {
            false
        }
    }

    /// Records the death of an instance that returned or faulted.
    ///
    /// A death while removals are pending satisfies one of them
    /// instead of decrementing `live` again: `remove` already took
    /// that instance out of the count.
    pub(crate) fn instance_finished(&self) {
        let mut counters = self.counters.lock();
        if counters.harvest > 0 {
            counters.harvest -= 1;
        } else {
            counters.live = counters.live.saturating_sub(1);
        }
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("wrapped", &self.env.read().is_some())
            .field("instances", &self.size())
            .finish()
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Process ({:#x})", self as *const Self as usize)
    }
}

/// Builder for [`Process`].
///
/// Unset fields fall back to the runtime defaults: a fresh unbounded
/// input channel, the default pool, no parent, one replica.
pub struct ProcessBuilder {
    factory: Arc<dyn ContextFactory>,
    env: Option<EnvBlob>,
    pool: Option<Arc<Pool>>,
    parent: Option<Weak<Process>>,
    replicas: u32,
}

impl ProcessBuilder {
    /// Sets the serialized environment.
    #[must_use]
    pub fn env(mut self, env: EnvBlob) -> Self {
        self.env = Some(env);
        self
    }

    /// Binds an explicit pool instead of the default pool.
    #[must_use]
    pub fn pool(mut self, pool: Arc<Pool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Records the creating process.
    #[must_use]
    pub fn parent(mut self, parent: &Arc<Process>) -> Self {
        self.parent = Some(Arc::downgrade(parent));
        self
    }

    /// Sets how many instances to spawn at construction (default 1).
    /// Ignored for processes built without an environment.
    #[must_use]
    pub fn replicas(mut self, n: u32) -> Self {
        self.replicas = n;
        self
    }

    /// Builds the process and, when an environment is present, spawns
    /// the configured replicas.
    ///
    /// A process without an environment is created empty: no
    /// instances, to be completed later with [`Process::wrap`].
    ///
    /// # Errors
    ///
    /// Any [`Process::spawn`] failure when replicas are spawned.
    pub fn build(self) -> Result<Arc<Process>, ProcessError> {
        let pool = self.pool.or_else(runtime::default_pool);
        let process = Arc::new(Process {
            env: RwLock::new(self.env),
            input: RwLock::new(MessageChannel::unbounded()),
            pool: RwLock::new(pool),
            parent: self.parent,
            factory: self.factory,
            counters: Mutex::new(Counters {
                live: 0,
                harvest: 0,
            }),
        });
        REGISTRY.register(&process);
        if process.env.read().is_some() {
            process.spawn(self.replicas)?;
        }
        Ok(process)
    }
}
