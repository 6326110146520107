//! Per-key lock striping.
//!
//! Each limiter owns one of these maps: key to a dedicated mutex wrapping
//! that key's state. Entries are created lazily on first use and never
//! removed, so key cardinality bounds memory (see the crate docs on idle-key
//! eviction). Creation contends only on the map shard holding the key;
//! steady-state access is serialized solely by the per-entry mutex, so
//! operations on different keys proceed fully in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

/// A lazily-populated map from key to exclusively-guarded per-key state.
pub(crate) struct KeyedState<T> {
    entries: DashMap<String, Arc<Mutex<T>>>,
}

impl<T> KeyedState<T> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get the guard for `key`, creating its state with `init` on first use.
    ///
    /// The shard lock is held only long enough to read or insert the entry;
    /// it is never held across the caller's core logic.
    pub fn entry(&self, key: &str, init: impl FnOnce() -> T) -> Arc<Mutex<T>> {
        if let Some(entry) = self.entries.get(key) {
            return Arc::clone(entry.value());
        }

        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(key = %key, "Creating per-key limiter state");
                Arc::new(Mutex::new(init()))
            });
        Arc::clone(entry.value())
    }

    /// The number of keys tracked so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
