//! Process-wide request counters
//!
//! Lightweight counting of offered load and completed outcomes using atomic
//! counters. Designed for minimal overhead and zero allocations in the hot
//! path; increments are atomic so no updates are lost under concurrency.

use std::sync::atomic::{AtomicU64, Ordering};

/// Registry of the three process-lifetime counters
///
/// One registry is created at process start and shared by every in-flight
/// request. Counters start at zero and are never reset while the process
/// runs. `requests_seen` measures offered load and is incremented for every
/// inbound request regardless of outcome; `responses_sent` and
/// `exceptions_raised` are mutually exclusive per request and reflect
/// completed outcomes only.
pub struct CounterRegistry {
    requests_seen: AtomicU64,
    responses_sent: AtomicU64,
    exceptions_raised: AtomicU64,
}

/// Point-in-time view of the registry
///
/// Snapshots taken concurrently with writers need not be linearizable, but
/// each counter is individually monotonic: a later snapshot never reports a
/// smaller value than an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    /// Requests received, regardless of outcome
    pub requests_seen: u64,
    /// Responses successfully returned by the inner handler
    pub responses_sent: u64,
    /// Inner-handler failures, including canceled in-flight requests
    pub exceptions_raised: u64,
}

impl CounterRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        CounterRegistry {
            requests_seen: AtomicU64::new(0),
            responses_sent: AtomicU64::new(0),
            exceptions_raised: AtomicU64::new(0),
        }
    }

    /// Record an inbound request
    pub fn record_request(&self) {
        self.requests_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed response
    pub fn record_response(&self) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inner-handler failure
    pub fn record_exception(&self) {
        self.exceptions_raised.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            requests_seen: self.requests_seen.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            exceptions_raised: self.exceptions_raised.load(Ordering::Relaxed),
        }
    }
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
