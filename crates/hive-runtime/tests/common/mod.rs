//! Shared helpers for runtime integration tests.
//!
//! The mock engine here stands in for the real execution engine: a
//! context that forwards every delivered message into a sink channel
//! the test inspects from the host side.
#![allow(dead_code)] // not every test binary uses every helper

use hive_runtime::channel::MessageChannel;
use hive_runtime::context::{Context, ContextFactory, StepOutcome};
use hive_runtime::error::ContextError;
use hive_runtime::instance::Instance;
use hive_runtime::message::Message;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Polls `cond` until it holds or the deadline passes.
pub fn wait_for(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Drains `n` messages from a sink channel, waiting as needed.
pub fn drain(sink: &Arc<MessageChannel>, n: usize, timeout: Duration) -> Vec<Message> {
    let mut out = Vec::with_capacity(n);
    let deadline = Instant::now() + timeout;
    while out.len() < n && Instant::now() < deadline {
        match sink.try_pop() {
            Some(message) => out.push(message),
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    out
}

/// Context that forwards every message to a sink.
struct ForwardContext {
    sink: Arc<MessageChannel>,
}

impl Context for ForwardContext {
    fn start(&mut self) -> StepOutcome {
        StepOutcome::AwaitingMessage { source: None }
    }

    fn resume(&mut self, message: Option<Message>) -> StepOutcome {
        if let Some(message) = message {
            self.sink.push(message).expect("sink push");
        }
        StepOutcome::AwaitingMessage { source: None }
    }
}

/// Factory producing [`ForwardContext`]s wired to one sink.
pub struct ForwardFactory {
    sink: Arc<MessageChannel>,
}

impl ForwardFactory {
    pub fn new(sink: Arc<MessageChannel>) -> Arc<Self> {
        Arc::new(Self { sink })
    }
}

impl ContextFactory for ForwardFactory {
    fn create(&self, _instance: &Arc<Instance>) -> Result<Box<dyn Context>, ContextError> {
        Ok(Box::new(ForwardContext {
            sink: Arc::clone(&self.sink),
        }))
    }
}

/// Context that yields voluntarily once before settling into the
/// usual message wait.
struct YieldOnceContext {
    sink: Arc<MessageChannel>,
}

impl Context for YieldOnceContext {
    fn start(&mut self) -> StepOutcome {
        StepOutcome::Yielded
    }

    fn resume(&mut self, message: Option<Message>) -> StepOutcome {
        match message {
            None => {
                // The wake-up after the voluntary yield.
                self.sink.push(Message::single("resumed")).expect("sink push");
                StepOutcome::AwaitingMessage { source: None }
            }
            Some(message) => {
                self.sink.push(message).expect("sink push");
                StepOutcome::AwaitingMessage { source: None }
            }
        }
    }
}

pub struct YieldOnceFactory {
    sink: Arc<MessageChannel>,
}

impl YieldOnceFactory {
    pub fn new(sink: Arc<MessageChannel>) -> Arc<Self> {
        Arc::new(Self { sink })
    }
}

impl ContextFactory for YieldOnceFactory {
    fn create(&self, _instance: &Arc<Instance>) -> Result<Box<dyn Context>, ContextError> {
        Ok(Box::new(YieldOnceContext {
            sink: Arc::clone(&self.sink),
        }))
    }
}

/// Context whose first message blows up.
struct FaultingContext;

impl Context for FaultingContext {
    fn start(&mut self) -> StepOutcome {
        StepOutcome::AwaitingMessage { source: None }
    }

    fn resume(&mut self, _message: Option<Message>) -> StepOutcome {
        StepOutcome::Faulted {
            error: "boom".to_string(),
            handled: true,
        }
    }
}

pub struct FaultingFactory;

impl ContextFactory for FaultingFactory {
    fn create(&self, _instance: &Arc<Instance>) -> Result<Box<dyn Context>, ContextError> {
        Ok(Box::new(FaultingContext))
    }
}
