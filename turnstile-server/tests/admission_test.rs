use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;
use turnstile::{CounterRegistry, SweepStore, ThrottlePolicy, ThrottleStore};
use turnstile_server::admission::AdmissionEngine;
use turnstile_server::app;
use turnstile_server::metrics::ServerMetrics;
use turnstile_server::resolver::ClientResolver;

fn build_app(min_interval: Duration) -> (Router, Arc<CounterRegistry>) {
    let store: Arc<dyn ThrottleStore> = Arc::new(SweepStore::new());
    let counters = Arc::new(CounterRegistry::new());
    let engine = Arc::new(AdmissionEngine::new(
        ThrottlePolicy::new(min_interval).unwrap(),
        Arc::clone(&store),
        ClientResolver::new(false),
    ));
    let metrics = Arc::new(ServerMetrics::new(Arc::clone(&counters), store));
    let router = app::build_router(engine, Arc::clone(&counters), metrics);
    (router, counters)
}

fn get_request(uri: &str, ip: [u8; 4]) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn first_request_is_admitted_second_is_throttled() {
    let (app, _) = build_app(Duration::from_secs(5));

    let first = app
        .clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after = second
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .expect("throttled response carries Retry-After");
    assert!(retry_after >= 1);

    let body = body_string(second).await;
    assert!(body.contains("Too many requests"));
}

#[tokio::test]
async fn request_after_the_window_is_admitted_again() {
    let (app, _) = build_app(Duration::from_millis(50));

    let first = app
        .clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(250)).await;

    let later = app
        .clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(later.status(), StatusCode::OK);
}

#[tokio::test]
async fn clients_are_throttled_independently() {
    let (app, _) = build_app(Duration::from_secs(5));

    let first = app
        .clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // A different client inside the first client's window is unaffected.
    let other = app
        .clone()
        .oneshot(get_request("/", [10, 0, 0, 2]))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);

    // The first client is still inside its window.
    let repeat = app
        .clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn clients_without_an_address_share_the_sentinel_key() {
    let (app, _) = build_app(Duration::from_secs(5));

    let first = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn counters_track_offered_load_and_outcomes() {
    let (app, counters) = build_app(Duration::from_secs(5));

    app.clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();
    app.clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();

    let snapshot = counters.snapshot();
    assert_eq!(snapshot.requests_seen, 2);
    assert_eq!(snapshot.responses_sent, 1);
    assert_eq!(snapshot.exceptions_raised, 0);
}

#[tokio::test]
async fn admitted_responses_pass_through_unchanged() {
    let (app, _) = build_app(Duration::from_secs(5));

    let response = app
        .clone()
        .oneshot(get_request("/greet/crab", [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let body = body_string(response).await;
    assert_eq!(body, "<h1>Hello, crab!</h1>\n");
}

#[tokio::test]
async fn user_agent_is_visible_to_handlers() {
    let (app, _) = build_app(Duration::from_secs(5));

    let mut request = Request::builder()
        .uri("/")
        .header(header::USER_AGENT, "integration-suite/1.0")
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 40000))));

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("integration-suite/1.0"));
}

#[tokio::test]
async fn observability_endpoints_are_never_throttled() {
    let (app, _) = build_app(Duration::from_secs(5));

    for _ in 0..5 {
        let health = app
            .clone()
            .oneshot(get_request("/health", [10, 0, 0, 1]))
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    for _ in 0..5 {
        let metrics = app
            .clone()
            .oneshot(get_request("/metrics", [10, 0, 0, 1]))
            .await
            .unwrap();
        assert_eq!(metrics.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn metrics_endpoint_renders_the_counters() {
    let (app, _) = build_app(Duration::from_secs(5));

    app.clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();
    app.clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/metrics", [10, 0, 0, 9]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("turnstile_requests_total 2"));
    assert!(body.contains("turnstile_responses_total 1"));
    assert!(body.contains("turnstile_exceptions_total 0"));
    assert!(body.contains("turnstile_tracked_keys 1"));
}

#[tokio::test]
async fn status_endpoint_reports_a_json_snapshot() {
    let (app, _) = build_app(Duration::from_secs(5));

    app.clone()
        .oneshot(get_request("/", [10, 0, 0, 1]))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/status", [10, 0, 0, 9]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let status: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status["requests_seen"], 1);
    assert_eq!(status["responses_sent"], 1);
    assert_eq!(status["exceptions_raised"], 0);
    assert_eq!(status["tracked_keys"], 1);
}
