use super::shard::ShardSet;
use super::{Admission, ThrottleStore, admission_rule};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

// Configuration constants
const DEFAULT_CAPACITY: usize = 10_000;

/// Capacity-capped store implementation
///
/// Enforces a hard bound on tracked entries: inserting a new client key into
/// a full shard evicts the shard's stalest entry first. Memory stays fixed
/// regardless of how many distinct clients appear.
///
/// Under capacity pressure an evicted entry may still be inside its window,
/// letting that client re-admit early; size the capacity above the expected
/// number of concurrently active clients.
///
/// # Example
///
/// ```
/// use turnstile::CappedStore;
///
/// let store = CappedStore::builder().capacity(50_000).build();
/// ```
pub struct CappedStore {
    shards: ShardSet,
    max_per_shard: usize,
    evicted: AtomicU64,
}

/// Builder for configuring a [`CappedStore`]
pub struct CappedStoreBuilder {
    capacity: usize,
    shard_count: usize,
}

impl CappedStore {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for fine-grained configuration
    pub fn builder() -> CappedStoreBuilder {
        CappedStoreBuilder {
            capacity: DEFAULT_CAPACITY,
            shard_count: ShardSet::default_shard_count(),
        }
    }
}

impl Default for CappedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrottleStore for CappedStore {
    fn check_and_update(&self, key: &str, now: SystemTime, min_interval: Duration) -> Admission {
        let mut map = self.shards.shard(key).lock().unwrap();
        match admission_rule(map.get(key).copied(), now, min_interval) {
            Admission::Admit => {
                if !map.contains_key(key) && map.len() >= self.max_per_shard {
                    // Shard is full: make room by dropping its stalest entry.
                    let stalest = map
                        .iter()
                        .min_by_key(|(_, last)| **last)
                        .map(|(k, _)| k.clone());
                    if let Some(stalest) = stalest {
                        map.remove(&stalest);
                        self.evicted.fetch_add(1, Ordering::Relaxed);
                    }
                }
                map.insert(key.to_string(), now);
                Admission::Admit
            }
            reject => reject,
        }
    }

    fn tracked_keys(&self) -> usize {
        self.shards.tracked_keys()
    }

    fn evicted_keys(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl CappedStoreBuilder {
    /// Maximum number of tracked client keys across all shards
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Number of lock shards (defaults to 4x the available cores)
    pub fn shards(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Build the store with the configured settings
    pub fn build(self) -> CappedStore {
        let shard_count = self.shard_count.max(1);
        let shards = ShardSet::new(shard_count, self.capacity);
        CappedStore {
            max_per_shard: (self.capacity / shard_count).max(1),
            shards,
            evicted: AtomicU64::new(0),
        }
    }
}
