use super::shard::ShardSet;
use super::{Admission, ThrottleStore, admission_rule};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

// Configuration constants
const DEFAULT_CAPACITY: usize = 1000;
const DEFAULT_RETENTION_SECS: u64 = 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Periodic-sweep store implementation
///
/// Tracks one last-admitted instant per client key and sweeps out entries
/// idle past the retention horizon at fixed intervals. Sweeps piggyback on
/// regular operations and lock one shard at a time, so there is no global
/// pause and no background task.
///
/// The retention horizon must be at least the policy interval; a shorter
/// horizon could evict an entry inside its window and re-admit early.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use turnstile::SweepStore;
///
/// let store = SweepStore::builder()
///     .capacity(100_000)
///     .retention(Duration::from_secs(120))
///     .sweep_interval(Duration::from_secs(60))
///     .build();
/// ```
pub struct SweepStore {
    shards: ShardSet,
    retention: Duration,
    sweep_interval: Duration,
    // Next instant a sweep is due
    next_sweep: Mutex<SystemTime>,
    evicted: AtomicU64,
}

/// Builder for configuring a [`SweepStore`]
pub struct SweepStoreBuilder {
    capacity: usize,
    shard_count: usize,
    retention: Duration,
    sweep_interval: Duration,
}

impl SweepStore {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for fine-grained configuration
    pub fn builder() -> SweepStoreBuilder {
        SweepStoreBuilder {
            capacity: DEFAULT_CAPACITY,
            shard_count: ShardSet::default_shard_count(),
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    fn maybe_sweep(&self, now: SystemTime) {
        {
            let mut next = self.next_sweep.lock().unwrap();
            if now < *next {
                return;
            }
            *next = now + self.sweep_interval;
        }

        let retention = self.retention;
        let removed = self.shards.retain(|_, last| {
            now.duration_since(last).unwrap_or(Duration::ZERO) <= retention
        });
        if removed > 0 {
            self.evicted.fetch_add(removed as u64, Ordering::Relaxed);
        }
    }
}

impl Default for SweepStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrottleStore for SweepStore {
    fn check_and_update(&self, key: &str, now: SystemTime, min_interval: Duration) -> Admission {
        let admission = {
            let mut map = self.shards.shard(key).lock().unwrap();
            match admission_rule(map.get(key).copied(), now, min_interval) {
                Admission::Admit => {
                    map.insert(key.to_string(), now);
                    Admission::Admit
                }
                reject => reject,
            }
        };

        // Sweep outside the shard lock, only when due.
        self.maybe_sweep(now);
        admission
    }

    fn tracked_keys(&self) -> usize {
        self.shards.tracked_keys()
    }

    fn evicted_keys(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl SweepStoreBuilder {
    /// Expected number of distinct client keys
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Number of lock shards (defaults to 4x the available cores)
    pub fn shards(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// How long an idle entry is retained before a sweep removes it
    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Interval between sweeps
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Build the store with the configured settings
    pub fn build(self) -> SweepStore {
        SweepStore {
            shards: ShardSet::new(self.shard_count, self.capacity),
            retention: self.retention,
            sweep_interval: self.sweep_interval,
            next_sweep: Mutex::new(SystemTime::now() + self.sweep_interval),
            evicted: AtomicU64::new(0),
        }
    }
}
