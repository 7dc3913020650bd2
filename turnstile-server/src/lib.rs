//! # Turnstile Server
//!
//! An HTTP host application gated by per-client admission control.
//!
//! ## Purpose
//!
//! Every inbound request passes through an interceptor chain before it
//! reaches a handler: offered load is counted, the client's identity is
//! resolved, and the minimum-interval throttle decides whether to forward
//! the request or answer `429 Too Many Requests` on the spot. The chain
//! observes the inner handler's outcome without altering it — responses pass
//! through unchanged and failures propagate verbatim, each counted exactly
//! once.
//!
//! ## Quick Start
//!
//! ```bash
//! # Defaults: 127.0.0.1:8080, one request per client per 100ms, sweep store
//! turnstile
//!
//! # Custom policy and store
//! turnstile --port 9090 --min-interval-ms 250 --store capped --store-capacity 50000
//!
//! # Behind a trusted reverse proxy
//! turnstile --trust-forwarded
//! ```
//!
//! Configure via CLI arguments or environment variables with the
//! `TURNSTILE_` prefix (CLI takes precedence).
//!
//! ## Endpoints
//!
//! - `/` and `/greet/{name}`: demonstration routes behind the admission layer
//! - `/health`: liveness probe (never throttled)
//! - `/metrics`: counters in Prometheus text format (never throttled)
//! - `/status`: JSON snapshot of counters and store gauges (never throttled)
//!
//! ## Architecture
//!
//! ```text
//!  request ──► user-agent capture
//!                    │
//!              ┌─────▼──────┐  count request, resolve client,
//!              │ admission  │  check the client's window
//!              │   layer    │
//!              └─────┬──────┘
//!          throttled │ admitted
//!        ┌───────────┤
//!  429 ◄─┘     ┌─────▼──────┐
//!              │   inner    │  response ──► count response
//!              │  handler   │  failure  ──► count exception, propagate
//!              └────────────┘
//! ```
//!
//! Throttle state is sharded per client key; counters are process-wide
//! atomics. Both are bounded and lock-free or fine-grained — no global lock
//! sits on the request path.

pub mod admission;
pub mod app;
pub mod config;
pub mod metrics;
pub mod resolver;
pub mod store;
pub mod useragent;
