use std::sync::Arc;
use std::time::{Duration, SystemTime};

mod capped;
mod shard;
mod sweep;


pub use capped::{CappedStore, CappedStoreBuilder};
pub use sweep::{SweepStore, SweepStoreBuilder};

/// Outcome of a per-key check-and-update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The key's last-admitted time was updated to `now`
    Admit,
    /// The key is still inside its window; the entry was left unmodified
    Reject {
        /// Remaining part of the window
        retry_after: Duration,
    },
}

/// Store trait for per-client throttle state
///
/// Implementations track one entry per distinct client key holding the last
/// instant a request from that key was admitted. `check_and_update` must be
/// atomic per key: two concurrent requests racing on the same key within one
/// window must not both observe [`Admission::Admit`]. Keys that hash to
/// different shards must not serialize on each other.
///
/// Implementations are also required to bound their growth: entries idle past
/// a retention horizon (or beyond a capacity cap) are evicted. The retention
/// horizon must be at least the policy interval, otherwise eviction could
/// re-open an active window.
pub trait ThrottleStore: Send + Sync {
    /// Atomically check and update the last-admitted time for `key`
    ///
    /// If the key is absent, an entry is created at `now` and the request
    /// admitted. If at least `min_interval` has elapsed since the stored
    /// instant, the entry is updated to `now` and the request admitted.
    /// Otherwise the entry is left unmodified and the request rejected.
    fn check_and_update(&self, key: &str, now: SystemTime, min_interval: Duration) -> Admission;

    /// Number of client entries currently tracked
    fn tracked_keys(&self) -> usize;

    /// Total entries evicted since the store was created
    fn evicted_keys(&self) -> u64;
}

impl<S: ThrottleStore + ?Sized> ThrottleStore for Arc<S> {
    fn check_and_update(&self, key: &str, now: SystemTime, min_interval: Duration) -> Admission {
        (**self).check_and_update(key, now, min_interval)
    }

    fn tracked_keys(&self) -> usize {
        (**self).tracked_keys()
    }

    fn evicted_keys(&self) -> u64 {
        (**self).evicted_keys()
    }
}

/// Shared admission rule: admit iff the key is new or its window has elapsed.
///
/// Callers invoke this under the key's shard lock and write `now` back on
/// admission, which is what makes check-and-update atomic per key.
fn admission_rule(
    last_admitted: Option<SystemTime>,
    now: SystemTime,
    min_interval: Duration,
) -> Admission {
    match last_admitted {
        None => Admission::Admit,
        Some(last) => {
            // A clock running backwards reads as zero elapsed time: stay
            // conservative and keep the stored instant non-decreasing.
            let elapsed = now.duration_since(last).unwrap_or(Duration::ZERO);
            if elapsed >= min_interval {
                Admission::Admit
            } else {
                Admission::Reject {
                    retry_after: min_interval - elapsed,
                }
            }
        }
    }
}
