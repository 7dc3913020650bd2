//! Router assembly
//!
//! Demonstration routes sit behind the admission layer; the observability
//! endpoints (`/health`, `/metrics`, `/status`) sit outside it so a
//! throttled client can still be diagnosed.

use crate::admission::{AdmissionEngine, AdmissionLayer};
use crate::metrics::{ServerMetrics, StatusSnapshot};
use crate::useragent::{UserAgent, capture_user_agent};
use axum::extract::{Path, State};
use axum::response::{Html, Json};
use axum::routing::get;
use axum::{Extension, Router, middleware};
use std::sync::Arc;
use turnstile::CounterRegistry;

/// Build the application router
///
/// The admission layer wraps only the routes added before it; user-agent
/// capture wraps the admission layer so the extension is present even on
/// throttled requests' traces.
pub fn build_router(
    engine: Arc<AdmissionEngine>,
    counters: Arc<CounterRegistry>,
    metrics: Arc<ServerMetrics>,
) -> Router {
    let gated = Router::new()
        .route("/", get(index))
        .route("/greet/{name}", get(greet))
        .layer(AdmissionLayer::new(engine, counters))
        .layer(middleware::from_fn(capture_user_agent));

    Router::new()
        .merge(gated)
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/status", get(status_json))
        .with_state(metrics)
}

async fn index(agent: Option<Extension<UserAgent>>) -> Html<String> {
    let agent = agent
        .map(|Extension(UserAgent(value))| value)
        .unwrap_or_default();
    Html(format!(
        "<h1>Welcome</h1>\n<p>You are browsing with: {agent}</p>\n"
    ))
}

async fn greet(Path(name): Path<String>) -> Html<String> {
    Html(format!("<h1>Hello, {name}!</h1>\n"))
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics_text(State(metrics): State<Arc<ServerMetrics>>) -> String {
    metrics.export_prometheus()
}

async fn status_json(State(metrics): State<Arc<ServerMetrics>>) -> Json<StatusSnapshot> {
    Json(metrics.status())
}
