//! # Turnstile
//!
//! Per-client request admission control for Rust services.
//!
//! ## Overview
//!
//! Turnstile gates units of work before they reach business logic. Each client
//! is tracked under an opaque [`ClientKey`]; the policy admits at most one
//! request per key per configured interval and rejects everything in between.
//! The library provides:
//!
//! - **Fixed-minimum-interval throttling**: one admission per key per window
//! - **Per-key atomicity**: concurrent requests on one key cannot both be admitted
//! - **Bounded state**: every store evicts stale client entries
//! - **Process-wide counters**: offered load and completed outcomes, lock-free
//!
//! ## Quick Start
//!
//! ```
//! use std::time::{Duration, SystemTime};
//! use turnstile::{ClientKey, Decision, SweepStore, Throttle, ThrottlePolicy};
//!
//! let policy = ThrottlePolicy::new(Duration::from_millis(100)).unwrap();
//! let throttle = Throttle::new(policy, SweepStore::new());
//!
//! let key = ClientKey::from("10.0.0.1");
//! let now = SystemTime::now();
//!
//! // First request from a client is always admitted.
//! assert!(throttle.admit(&key, now).is_allowed());
//!
//! // A second request inside the window is rejected.
//! match throttle.admit(&key, now + Duration::from_millis(50)) {
//!     Decision::Throttled { retry_after } => assert!(retry_after <= Duration::from_millis(100)),
//!     Decision::Allow => unreachable!(),
//! }
//! ```
//!
//! ## Store Types
//!
//! State grows by one entry per distinct client key, so every store is
//! bounded. Two strategies are provided:
//!
//! ### [`SweepStore`]
//! Periodically sweeps entries whose last admission is older than a retention
//! horizon. Predictable overhead, best default.
//!
//! ```
//! use std::time::Duration;
//! use turnstile::SweepStore;
//!
//! let store = SweepStore::builder()
//!     .capacity(100_000)
//!     .retention(Duration::from_secs(60))
//!     .sweep_interval(Duration::from_secs(60))
//!     .build();
//! ```
//!
//! ### [`CappedStore`]
//! Enforces a hard capacity; inserting past the cap evicts the stalest entry.
//! Use when memory must stay fixed regardless of traffic shape.
//!
//! ```
//! use turnstile::CappedStore;
//!
//! let store = CappedStore::builder().capacity(10_000).build();
//! ```
//!
//! ## Counting
//!
//! [`CounterRegistry`] tracks offered load and completed outcomes for the
//! whole process. Counters only ever go up while the process runs:
//!
//! ```
//! use turnstile::CounterRegistry;
//!
//! let counters = CounterRegistry::new();
//! counters.record_request();
//! counters.record_response();
//!
//! let snapshot = counters.snapshot();
//! assert_eq!(snapshot.requests_seen, 1);
//! assert_eq!(snapshot.responses_sent, 1);
//! assert_eq!(snapshot.exceptions_raised, 0);
//! ```
//!
//! ## Thread Safety
//!
//! Stores synchronize per shard, so requests for unrelated clients do not
//! contend; the counter registry is lock-free. Share both behind an `Arc`.
//!
//! ## Features
//!
//! - `ahash` (default): use AHash for faster store hashing

pub mod core;

pub use core::{
    Admission, CappedStore, CappedStoreBuilder, ClientKey, CounterRegistry, CountersSnapshot,
    Decision, PolicyError, SweepStore, SweepStoreBuilder, Throttle, ThrottlePolicy, ThrottleStore,
};
