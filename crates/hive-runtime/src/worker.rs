//! Pool worker loop.
//!
//! Each worker blocks on its pool's ready queue and drives whatever
//! instance it pops:
//!
//! 1. Pop one entry. The exit sentinel terminates the worker.
//! 2. Step the instance's context with the next stimulus (driver
//!    start, a deposited message, or a plain wake after a voluntary
//!    yield).
//! 3. Classify the outcome: waiting instances drain their channel
//!    inline while messages are buffered and park when it runs dry;
//!    voluntary yields are re-enqueued; finished or faulted instances
//!    are retired.
//!
//! `remove()` harvest tickets are honored at the two safe points (on
//! dispatch and just before parking), so a surplus instance dies
//! without ever being interrupted mid-step.

use crate::context::StepOutcome;
use crate::error::PoolError;
use crate::instance::{Instance, InstanceState};
use crate::pool::{Pool, ReadyEntry, WorkerGuard};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Starts one worker thread for `pool`.
pub(crate) fn spawn(pool: &Arc<Pool>, id: u64) -> Result<JoinHandle<()>, PoolError> {
    let pool = Arc::clone(pool);
    thread::Builder::new()
        .name(format!("hive-worker-{id}"))
        .spawn(move || run(pool, id))
        .map_err(PoolError::Spawn)
}

fn run(pool: Arc<Pool>, id: u64) {
    let guard = WorkerGuard::enter(pool);
    debug!(worker = id, "worker started");
    loop {
        match guard.pool().ready_queue().pop() {
            ReadyEntry::Exit => {
                debug!(worker = id, "exit sentinel consumed");
                break;
            }
            ReadyEntry::Run(instance) => dispatch(guard.pool(), id, instance),
        }
    }
    debug!(worker = id, "worker stopped");
}

/// Drives one instance until it parks, yields, or terminates.
fn dispatch(pool: &Arc<Pool>, worker: u64, instance: Arc<Instance>) {
    let task = Arc::clone(instance.task());

    loop {
        // Safe point: honor pending remove() before running.
        if task.consume_harvest_ticket() {
            trace!(worker, instance = instance.addr(), "harvested");
            retire(&instance);
            return;
        }

        let outcome = {
            let mut slot = instance.context_mut();
            let Some(context) = slot.as_mut() else {
                // Already closed; a stale queue entry.
                return;
            };
            if instance.mark_started() {
                instance.set_state(InstanceState::Running);
                context.start()
            } else if let Some(message) = instance.take_pending() {
                instance.set_state(InstanceState::Running);
                context.resume(Some(message))
            } else if instance.take_yield_latch() {
                instance.set_state(InstanceState::Running);
                context.resume(None)
            } else {
                // Woken without a stimulus (harvest nudge that found
                // no ticket for this instance): go back to waiting.
                drop(slot);
                let channel = instance
                    .parked_on()
                    .unwrap_or_else(|| task.input());
                match channel.park_or_take(&instance) {
                    Some(message) => {
                        instance.deposit(message);
                        continue;
                    }
                    None => return,
                }
            }
        };

        match outcome {
            StepOutcome::AwaitingMessage { source } => {
                // Safe point: a remove() issued mid-step lands here.
                if task.consume_harvest_ticket() {
                    trace!(worker, instance = instance.addr(), "harvested at park");
                    retire(&instance);
                    return;
                }
                let channel = source.unwrap_or_else(|| task.input());
                match channel.park_or_take(&instance) {
                    Some(message) => {
                        // A message is already buffered: keep the
                        // instance and step it again without a trip
                        // through the ready queue.
                        instance.deposit(message);
                    }
                    None => return, // parked BLOCKED
                }
            }
            StepOutcome::Yielded => {
                instance.set_yield_latch();
                pool.enqueue_ready(instance);
                return;
            }
            StepOutcome::Done => {
                debug!(worker, instance = instance.addr(), "instance finished");
                finish(&instance);
                return;
            }
            StepOutcome::Faulted { error, handled } => {
                warn!(
                    worker,
                    instance = instance.addr(),
                    handled,
                    error = error.as_str(),
                    "instance faulted"
                );
                finish(&instance);
                return;
            }
        }
    }
}

/// Terminates an instance that consumed a harvest ticket. The live
/// count was already decremented by `remove`.
fn retire(instance: &Arc<Instance>) {
    instance.close();
}

/// Terminates an instance that returned or faulted.
fn finish(instance: &Arc<Instance>) {
    instance.close();
    instance.task().instance_finished();
}
