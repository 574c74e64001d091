//! Per-key mutual exclusion.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Serialises work per key while letting distinct keys run in parallel.
///
/// Lock entries are created on demand and pruned once nobody holds or
/// waits on them.
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Runs `f` while holding the lock for `key`.
    ///
    /// The entry is pruned on the way out even if `f` panics.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        // Locals drop in reverse: guard, then our Arc, then the pruner.
        let _prune = PruneOnExit {
            locks: &self.locks,
            key,
        };
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let _guard = lock.lock();
        f()
    }

    /// Returns the number of keys currently locked or waited on.
    pub fn active_keys(&self) -> usize {
        self.locks.len()
    }
}

struct PruneOnExit<'a, K: Eq + Hash> {
    locks: &'a DashMap<K, Arc<Mutex<()>>>,
    key: &'a K,
}

impl<K: Eq + Hash> Drop for PruneOnExit<'_, K> {
    fn drop(&mut self) {
        self.locks.remove_if(self.key, |_, l| Arc::strong_count(l) == 1);
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
