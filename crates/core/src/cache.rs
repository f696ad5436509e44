//! Memoized diff results.
//!
//! Versions are immutable, so a cached diff never goes stale; entries only
//! leave the cache through least-recently-used eviction once `capacity` is
//! reached. Keys are order-sensitive: `(a, b)` and `(b, a)` are distinct.
//!
//! Callers must resolve both version ids through the tenant-checked store
//! before consulting the cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::diff::DiffResult;

type Key = (i64, i64);

struct Entry {
    value: Arc<DiffResult>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Key, Entry>,
    /// `last_used` tick -> key, oldest first.
    recency: BTreeMap<u64, Key>,
    tick: u64,
}

impl CacheState {
    fn touch(&mut self, key: Key) -> Option<Arc<DiffResult>> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(&key)?;
        self.recency.remove(&entry.last_used);
        entry.last_used = tick;
        self.recency.insert(tick, key);
        Some(Arc::clone(&entry.value))
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Thread-safe LRU cache of diff results keyed by `(from_version_id,
/// to_version_id)`.
pub struct ComparisonCache {
    capacity: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ComparisonCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("comparison cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Look up the diff of `from` against `to`, marking it recently used.
    pub fn get(&self, from: i64, to: i64) -> Option<Arc<DiffResult>> {
        let found = self.lock().touch((from, to));
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(from, to, "comparison cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(from, to, "comparison cache miss");
        }
        found
    }

    /// Store the diff of `from` against `to`, evicting the least recently
    /// used entry when full. Returns the shared cached value.
    pub fn put(&self, from: i64, to: i64, result: DiffResult) -> Arc<DiffResult> {
        let value = Arc::new(result);
        if self.capacity == 0 {
            return value;
        }

        let mut state = self.lock();
        state.tick += 1;
        let tick = state.tick;
        let key = (from, to);

        if let Some(old) = state.entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                last_used: tick,
            },
        ) {
            state.recency.remove(&old.last_used);
        }
        state.recency.insert(tick, key);

        while state.entries.len() > self.capacity {
            let Some((_, evicted)) = state.recency.pop_first() else {
                break;
            };
            state.entries.remove(&evicted);
            debug!(from = evicted.0, to = evicted.1, "evicted comparison");
        }
        value
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.recency.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity,
        }
    }
}
