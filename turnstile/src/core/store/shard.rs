use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::SystemTime;

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

// Pre-allocate shard maps with headroom to avoid rehashing.
const CAPACITY_OVERHEAD_FACTOR: f64 = 1.3;

/// Mutex-guarded partitions of the per-client entry map
///
/// Keys are hashed across a fixed set of shards, each with its own lock, so
/// operations on unrelated clients do not contend. All operations on one key
/// serialize on that key's shard lock, which is what the per-key atomicity
/// guarantee rests on.
pub(super) struct ShardSet {
    shards: Vec<Mutex<HashMap<String, SystemTime>>>,
}

impl ShardSet {
    /// Default shard count: oversubscribe the cores for better distribution.
    pub(super) fn default_shard_count() -> usize {
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        cpu_count * 4
    }

    pub(super) fn new(shard_count: usize, capacity: usize) -> Self {
        let shard_count = shard_count.max(1);
        let per_shard =
            ((capacity / shard_count).max(1) as f64 * CAPACITY_OVERHEAD_FACTOR) as usize;

        let shards = (0..shard_count)
            .map(|_| Mutex::new(HashMap::with_capacity(per_shard)))
            .collect();

        ShardSet { shards }
    }

    pub(super) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The shard holding `key`
    pub(super) fn shard(&self, key: &str) -> &Mutex<HashMap<String, SystemTime>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }

    /// Entries across all shards
    pub(super) fn tracked_keys(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap().len())
            .sum()
    }

    /// Drop entries failing `keep`, one shard lock at a time
    ///
    /// Returns the number of entries removed. Unrelated shards stay available
    /// while each one is swept.
    pub(super) fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&str, SystemTime) -> bool,
    {
        let mut removed = 0;
        for shard in &self.shards {
            let mut map = shard.lock().unwrap();
            let before = map.len();
            map.retain(|key, last| keep(key, *last));
            removed += before - map.len();
        }
        removed
    }
}
