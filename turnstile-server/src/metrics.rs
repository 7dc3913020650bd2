//! Metrics export for observability collectors
//!
//! Renders the counter registry and store gauges on demand, either as
//! Prometheus text exposition or as a JSON snapshot. Reading metrics never
//! touches the admission path.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use turnstile::{CounterRegistry, ThrottleStore};

/// On-demand view over the counters and the throttle store
pub struct ServerMetrics {
    /// Server start time
    start_time: Instant,
    counters: Arc<CounterRegistry>,
    store: Arc<dyn ThrottleStore>,
}

/// JSON snapshot served at /status
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Seconds since server start
    pub uptime_seconds: u64,
    /// Requests received, regardless of outcome
    pub requests_seen: u64,
    /// Responses successfully returned by the inner handlers
    pub responses_sent: u64,
    /// Inner-handler failures, including canceled in-flight requests
    pub exceptions_raised: u64,
    /// Client keys currently tracked by the throttle store
    pub tracked_keys: usize,
    /// Client keys evicted since start
    pub evicted_keys: u64,
}

impl ServerMetrics {
    pub fn new(counters: Arc<CounterRegistry>, store: Arc<dyn ThrottleStore>) -> Self {
        ServerMetrics {
            start_time: Instant::now(),
            counters,
            store,
        }
    }

    /// Seconds since server start
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Point-in-time JSON snapshot
    pub fn status(&self) -> StatusSnapshot {
        let snapshot = self.counters.snapshot();
        StatusSnapshot {
            uptime_seconds: self.uptime_seconds(),
            requests_seen: snapshot.requests_seen,
            responses_sent: snapshot.responses_sent,
            exceptions_raised: snapshot.exceptions_raised,
            tracked_keys: self.store.tracked_keys(),
            evicted_keys: self.store.evicted_keys(),
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let snapshot = self.counters.snapshot();
        // ~4 lines per metric, 6 metrics
        let mut output = String::with_capacity(1200);

        output.push_str("# HELP turnstile_uptime_seconds Time since server start in seconds\n");
        output.push_str("# TYPE turnstile_uptime_seconds gauge\n");
        output.push_str(&format!(
            "turnstile_uptime_seconds {}\n\n",
            self.uptime_seconds()
        ));

        output.push_str(
            "# HELP turnstile_requests_total Requests received, regardless of outcome\n",
        );
        output.push_str("# TYPE turnstile_requests_total counter\n");
        output.push_str(&format!(
            "turnstile_requests_total {}\n\n",
            snapshot.requests_seen
        ));

        output.push_str(
            "# HELP turnstile_responses_total Responses returned by the inner handlers\n",
        );
        output.push_str("# TYPE turnstile_responses_total counter\n");
        output.push_str(&format!(
            "turnstile_responses_total {}\n\n",
            snapshot.responses_sent
        ));

        output.push_str("# HELP turnstile_exceptions_total Inner-handler failures\n");
        output.push_str("# TYPE turnstile_exceptions_total counter\n");
        output.push_str(&format!(
            "turnstile_exceptions_total {}\n\n",
            snapshot.exceptions_raised
        ));

        output.push_str("# HELP turnstile_tracked_keys Client keys currently tracked\n");
        output.push_str("# TYPE turnstile_tracked_keys gauge\n");
        output.push_str(&format!(
            "turnstile_tracked_keys {}\n\n",
            self.store.tracked_keys()
        ));

        output.push_str("# HELP turnstile_evicted_keys_total Client keys evicted since start\n");
        output.push_str("# TYPE turnstile_evicted_keys_total counter\n");
        output.push_str(&format!(
            "turnstile_evicted_keys_total {}\n",
            self.store.evicted_keys()
        ));

        output
    }
}
