//! Weak-valued address registries.
//!
//! User code reacquires handles by raw address (`ptr()` → `get(ptr)`).
//! The registry maps each entity's address to a weak handle so that:
//!
//! - `get` on the same address yields the *same* shared handle,
//! - entries vanish once no strong handle remains,
//! - a stale address resolves to "not found" rather than dangling.
//!
//! One registry exists per entity kind (pool, process, channel), owned
//! by the respective module.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Address → weak handle map for one entity kind.
pub(crate) struct AddrRegistry<T> {
    entries: Mutex<HashMap<usize, Weak<T>>>,
}

impl<T> AddrRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the stable address of a handle.
    pub(crate) fn addr_of(handle: &Arc<T>) -> usize {
        Arc::as_ptr(handle) as usize
    }

    /// Registers a handle and returns its address.
    ///
    /// Dead entries are pruned on the way, keeping the map bounded by
    /// the number of live entities.
    pub(crate) fn register(&self, handle: &Arc<T>) -> usize {
        let addr = Self::addr_of(handle);
        let mut entries = self.entries.lock();
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.insert(addr, Arc::downgrade(handle));
        addr
    }

    /// Resolves an address to a live handle.
    pub(crate) fn get(&self, addr: usize) -> Option<Arc<T>> {
        let mut entries = self.entries.lock();
        match entries.get(&addr).and_then(Weak::upgrade) {
            Some(handle) => Some(handle),
            None => {
                entries.remove(&addr);
                None
            }
        }
    }

    /// Drops the entry at an address, if any.
    pub(crate) fn unregister(&self, addr: usize) {
        self.entries.lock().remove(&addr);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
