//! Shared helpers for Lua integration tests.
#![allow(dead_code)] // not every test binary uses every helper

use hive_runtime::{Message, MessageChannel, RuntimeConfig};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

/// Initializes the shared default pool once per test binary.
pub fn ensure_runtime() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        hive_runtime::runtime::init(&RuntimeConfig::with_pool_size(4)).expect("runtime init");
    });
}

/// Resolves a channel address returned from a Lua script.
pub fn channel_at(addr: i64) -> Arc<MessageChannel> {
    MessageChannel::get(addr as usize).expect("channel registered")
}

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

/// Drains `n` messages from a channel, waiting as needed.
pub fn drain(channel: &Arc<MessageChannel>, n: usize, timeout: Duration) -> Vec<Message> {
    let mut out = Vec::with_capacity(n);
    let deadline = Instant::now() + timeout;
    while out.len() < n && Instant::now() < deadline {
        match channel.try_pop() {
            Some(message) => out.push(message),
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    out
}
