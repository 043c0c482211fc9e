//! Cooperative process runtime for hive.
//!
//! Many lightweight logical processes, each with an isolated
//! execution context, multiplex over a dynamically sized pool of
//! worker threads and communicate through message channels.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Process                               │
//! │   env (serialized entry + error handler)     parent (weak)       │
//! │   input: MessageChannel  ◄───────────── shared by all instances  │
//! │   pool binding                                                   │
//! └───────┬──────────────────────────────────────────────────────────┘
//! │ spawn(n)
//! ▼
//! ┌──────────────┐   park/wake    ┌───────────────────────────────┐
//! │  Instance    │ ◄────────────► │        MessageChannel         │
//! │  (Context)   │                │  buffer ++ waiter list        │
//! └──────┬───────┘                └───────────────────────────────┘
//! │ READY
//! ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Pool: ready queue (lock-free FIFO, null sentinel = worker exit) │
//! │  worker threads: pop → step context → park / re-enqueue / retire │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Pool`] | Worker threads drawing from one ready queue |
//! | [`Process`] | Template: environment + shared input + pool binding |
//! | [`Instance`] | One live executor of a process |
//! | [`MessageChannel`] | FIFO of messages with parked consumers |
//! | [`Context`] | Opaque per-instance execution state (engine-provided) |
//! | [`LfQueue`] | Lock-free MPMC FIFO behind every ready queue |
//!
//! # Execution model
//!
//! Inside one instance execution is single-threaded and cooperative;
//! it suspends only when it waits for a message or yields explicitly.
//! Two instances of the same process may run in parallel on different
//! workers; their contexts share nothing. Workers never preempt: a
//! runaway step blocks its worker indefinitely.
//!
//! Killing a worker is deferred to idleness: [`Pool::kill`] pushes a
//! null sentinel through the ready queue and the worker that pops it
//! exits, never abandoning work it already holds.
//!
//! # Related Crates
//!
//! - `hive-types`: the [`ErrorCode`](hive_types::ErrorCode) contract
//! - `hive-lua`: the execution engine implementing [`Context`]

pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod instance;
pub mod message;
pub mod pool;
pub mod process;
pub mod queue;
mod registry;
pub mod runtime;
mod worker;

pub use channel::MessageChannel;
pub use config::RuntimeConfig;
pub use context::{Context, ContextFactory, StepOutcome};
pub use error::{ChannelError, ContextError, PoolError, ProcessError, QueueError, RuntimeError};
pub use instance::{Instance, InstanceState};
pub use message::{Message, MsgValue};
pub use pool::{Pool, ReadyEntry};
pub use process::{EnvBlob, Process, ProcessBuilder};
pub use queue::LfQueue;
