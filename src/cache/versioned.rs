//! Bounded, versioned concurrent cache.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::CacheConfig;

/// A cached value together with the version it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<V> {
    /// The cached value.
    pub value: V,
    /// Cache-wide write sequence number; higher means written later.
    pub version: u64,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    version: u64,
    inserted_at: Instant,
}

/// A concurrent key-value cache with last-write-wins slots.
///
/// Every write is stamped with a cache-wide, strictly increasing version so
/// readers can tell whether a slot changed since they last looked. The cache
/// is optionally bounded by entry count (the oldest write is evicted first)
/// and by age (expired entries are invisible and removed lazily).
///
/// Writes and removals are serialised on an ordered version index, so
/// evicting the oldest write is a pop from the front of that index rather
/// than a scan of the map. The index lock is always taken before any map
/// shard lock.
///
/// # Example
///
/// ```
/// use punch_integrity::cache::VersionedCache;
///
/// let cache: VersionedCache<&str, u32> = VersionedCache::unbounded();
/// let first = cache.insert("a", 1);
/// let second = cache.insert("a", 2);
///
/// assert!(second > first);
/// assert_eq!(cache.get(&"a"), Some(2));
/// ```
#[derive(Debug)]
pub struct VersionedCache<K: Eq + Hash, V> {
    entries: DashMap<K, Entry<V>>,
    /// Live version -> key, oldest first.
    order: Mutex<BTreeMap<u64, K>>,
    next_version: AtomicU64,
    max_entries: Option<usize>,
    ttl: Option<Duration>,
}

impl<K, V> VersionedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache with the given bounds.
    pub fn with_bounds(max_entries: Option<usize>, ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(BTreeMap::new()),
            next_version: AtomicU64::new(0),
            max_entries,
            ttl,
        }
    }

    /// Creates a cache bounded as configured.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_bounds(config.max_entries, config.ttl())
    }

    /// Creates a cache with no bounds.
    pub fn unbounded() -> Self {
        Self::with_bounds(None, None)
    }

    /// Writes `value` at `key`, replacing any previous entry, and returns
    /// the version written.
    pub fn insert(&self, key: K, value: V) -> u64 {
        self.insert_with(key, |_| value)
    }

    /// Writes the value built from the new version at `key` and returns
    /// that version. Lets callers embed the version in the value itself.
    pub fn insert_with<F>(&self, key: K, build: F) -> u64
    where
        F: FnOnce(u64) -> V,
    {
        let mut order = self.order.lock();
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.entries.insert(
            key.clone(),
            Entry {
                value: build(version),
                version,
                inserted_at: Instant::now(),
            },
        );
        if let Some(previous) = previous {
            order.remove(&previous.version);
        }
        order.insert(version, key);
        self.enforce_capacity(&mut order);
        version
    }

    /// Returns the live value at `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_versioned(key).map(|v| v.value)
    }

    /// Returns the live value at `key` with its version.
    pub fn get_versioned(&self, key: &K) -> Option<Versioned<V>> {
        {
            let entry = self.entries.get(key)?;
            if !self.is_expired(&entry) {
                return Some(Versioned {
                    value: entry.value.clone(),
                    version: entry.version,
                });
            }
        }
        // The read guard is released above; removing under it would deadlock.
        let mut order = self.order.lock();
        if let Some((_, removed)) = self.entries.remove_if(key, |_, e| self.is_expired(e)) {
            order.remove(&removed.version);
        }
        None
    }

    /// Returns every live value, in no particular order.
    pub fn values(&self) -> Vec<V> {
        self.entries
            .iter()
            .filter(|e| !self.is_expired(e.value()))
            .map(|e| e.value().value.clone())
            .collect()
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !self.is_expired(e.value()))
            .count()
    }

    /// Returns true if no live entry remains.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut order = self.order.lock();
        self.entries.clear();
        order.clear();
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut order = self.order.lock();
        let mut dropped = 0;
        self.entries.retain(|_, e| {
            if self.is_expired(e) {
                order.remove(&e.version);
                dropped += 1;
                false
            } else {
                true
            }
        });
        dropped
    }

    fn is_expired(&self, entry: &Entry<V>) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }

    /// Evicts the oldest writes until the map fits. Caller holds `order`.
    fn enforce_capacity(&self, order: &mut BTreeMap<u64, K>) {
        let Some(max_entries) = self.max_entries else {
            return;
        };
        while self.entries.len() > max_entries {
            let Some((version, key)) = order.pop_first() else {
                break;
            };
            self.entries.remove_if(&key, |_, e| e.version == version);
        }
    }

    #[cfg(test)]
    fn indexed_len(&self) -> usize {
        self.order.lock().len()
    }
}
