//! The admission interceptor chain
//!
//! [`AdmissionLayer`] wraps the inner handler stack with the full admission
//! sequence: count the request, resolve the client, check the throttle
//! window, and either answer `429 Too Many Requests` on the spot or forward
//! the request untouched. The inner handler's outcome is observed but never
//! altered — responses pass through unchanged, failures propagate verbatim,
//! and a canceled in-flight request is recorded as an exception rather than
//! silently dropped.
//!
//! Counting rules:
//! - requests-seen is incremented for every inbound request, before the
//!   decision, so offered load is measured
//! - responses-sent and exceptions-raised are mutually exclusive per request
//!   and reflect completed outcomes only
//! - a throttled rejection increments neither

use crate::resolver::ClientResolver;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};
use tower::{Layer, Service};
use turnstile::{CounterRegistry, Decision, Throttle, ThrottlePolicy, ThrottleStore};

/// Static rejection page served to throttled clients
const THROTTLED_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>Too many requests</title></head>\n<body>\n<h1>Too many requests</h1>\n<p>Your request was throttled. Retry once the interval has passed.</p>\n</body>\n</html>\n";

/// Admission decisions for inbound requests
///
/// Resolves the client's identity and applies the throttle policy. This is
/// the single policy seam: a different admission rule can replace the
/// minimum-interval check without touching the interceptor chain.
pub struct AdmissionEngine {
    throttle: Throttle<Arc<dyn ThrottleStore>>,
    resolver: ClientResolver,
}

impl AdmissionEngine {
    pub fn new(
        policy: ThrottlePolicy,
        store: Arc<dyn ThrottleStore>,
        resolver: ClientResolver,
    ) -> Self {
        AdmissionEngine {
            throttle: Throttle::new(policy, store),
            resolver,
        }
    }

    /// Decide whether to admit a request
    pub fn admit(&self, request: &Request) -> Decision {
        let key = self.resolver.resolve(request);
        let decision = self.throttle.admit(&key, SystemTime::now());
        if let Decision::Throttled { retry_after } = decision {
            tracing::debug!(
                client = %key,
                retry_after_ms = retry_after.as_millis() as u64,
                "request throttled"
            );
        }
        decision
    }
}

/// Layer applying admission control around an inner service
#[derive(Clone)]
pub struct AdmissionLayer {
    engine: Arc<AdmissionEngine>,
    counters: Arc<CounterRegistry>,
}

impl AdmissionLayer {
    pub fn new(engine: Arc<AdmissionEngine>, counters: Arc<CounterRegistry>) -> Self {
        AdmissionLayer { engine, counters }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            engine: Arc::clone(&self.engine),
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Service produced by [`AdmissionLayer`]
#[derive(Clone)]
pub struct AdmissionService<S> {
    inner: S,
    engine: Arc<AdmissionEngine>,
    counters: Arc<CounterRegistry>,
}

impl<S> Service<Request> for AdmissionService<S>
where
    S: Service<Request, Response = Response>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Offered load is counted regardless of outcome.
        self.counters.record_request();

        match self.engine.admit(&request) {
            Decision::Throttled { retry_after } => {
                // Short-circuit: the inner service is never invoked and the
                // outcome counters stay untouched.
                let response = throttled_response(retry_after);
                Box::pin(std::future::ready(Ok(response)))
            }
            Decision::Allow => {
                let future = self.inner.call(request);
                let guard = OutcomeGuard::new(Arc::clone(&self.counters));
                Box::pin(async move {
                    match future.await {
                        Ok(response) => {
                            guard.settle_response();
                            Ok(response)
                        }
                        Err(error) => {
                            guard.settle_exception();
                            Err(error)
                        }
                    }
                })
            }
        }
    }
}

/// Records exactly one completed outcome per admitted request
///
/// If the response future is dropped before completion (client gone, timeout
/// upstream), the guard's drop records an exception so the outcome is never
/// silently lost.
struct OutcomeGuard {
    counters: Arc<CounterRegistry>,
    settled: bool,
}

impl OutcomeGuard {
    fn new(counters: Arc<CounterRegistry>) -> Self {
        OutcomeGuard {
            counters,
            settled: false,
        }
    }

    fn settle_response(mut self) {
        self.settled = true;
        self.counters.record_response();
    }

    fn settle_exception(mut self) {
        self.settled = true;
        self.counters.record_exception();
    }
}

impl Drop for OutcomeGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.counters.record_exception();
        }
    }
}

/// Synthesize the rejection response for a throttled request
fn throttled_response(retry_after: Duration) -> Response {
    // Retry-After is whole seconds; round up so clients never retry early.
    let seconds = retry_after.as_secs_f64().ceil() as u64;
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, seconds.to_string())],
        Html(THROTTLED_PAGE),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ClientResolver;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use std::convert::Infallible;
    use std::io;
    use std::net::SocketAddr;
    use turnstile::SweepStore;

    fn engine() -> Arc<AdmissionEngine> {
        Arc::new(AdmissionEngine::new(
            ThrottlePolicy::default(),
            Arc::new(SweepStore::new()),
            ClientResolver::new(false),
        ))
    }

    fn request(ip: [u8; 4]) -> Request {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        request
    }

    #[tokio::test]
    async fn passes_through_and_counts_a_response() {
        let counters = Arc::new(CounterRegistry::new());
        let layer = AdmissionLayer::new(engine(), Arc::clone(&counters));
        let mut service = layer.layer(tower::service_fn(|_request: Request| async {
            Ok::<_, Infallible>((StatusCode::OK, "hello").into_response())
        }));

        let response = service.call(request([10, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.requests_seen, 1);
        assert_eq!(snapshot.responses_sent, 1);
        assert_eq!(snapshot.exceptions_raised, 0);
    }

    #[tokio::test]
    async fn throttled_request_short_circuits() {
        let counters = Arc::new(CounterRegistry::new());
        let layer = AdmissionLayer::new(engine(), Arc::clone(&counters));
        let mut service = layer.layer(tower::service_fn(|_request: Request| async {
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        }));

        let first = service.call(request([10, 0, 0, 1])).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = service.call(request([10, 0, 0, 1])).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));

        // Both requests counted; only the admitted one produced a response.
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.requests_seen, 2);
        assert_eq!(snapshot.responses_sent, 1);
        assert_eq!(snapshot.exceptions_raised, 0);
    }

    #[tokio::test]
    async fn inner_failure_is_counted_and_propagated() {
        let counters = Arc::new(CounterRegistry::new());
        let layer = AdmissionLayer::new(engine(), Arc::clone(&counters));
        let mut service = layer.layer(tower::service_fn(|_request: Request| async {
            Err::<Response, io::Error>(io::Error::other("inner handler failed"))
        }));

        let error = service.call(request([10, 0, 0, 1])).await.unwrap_err();
        assert_eq!(error.to_string(), "inner handler failed");

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.requests_seen, 1);
        assert_eq!(snapshot.responses_sent, 0);
        assert_eq!(snapshot.exceptions_raised, 1);
    }

    #[tokio::test]
    async fn canceled_in_flight_request_counts_as_exception() {
        let counters = Arc::new(CounterRegistry::new());
        let layer = AdmissionLayer::new(engine(), Arc::clone(&counters));
        let mut service = layer.layer(tower::service_fn(|_request: Request| async {
            std::future::pending::<Result<Response, Infallible>>().await
        }));

        let future = service.call(request([10, 0, 0, 1]));
        drop(future);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.requests_seen, 1);
        assert_eq!(snapshot.responses_sent, 0);
        assert_eq!(snapshot.exceptions_raised, 1);
    }

    #[tokio::test]
    async fn different_clients_are_independent() {
        let counters = Arc::new(CounterRegistry::new());
        let layer = AdmissionLayer::new(engine(), Arc::clone(&counters));
        let mut service = layer.layer(tower::service_fn(|_request: Request| async {
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        }));

        let first = service.call(request([10, 0, 0, 1])).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // A different client inside the first client's window is unaffected.
        let other = service.call(request([10, 0, 0, 2])).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejection_body_is_the_static_page() {
        let counters = Arc::new(CounterRegistry::new());
        let layer = AdmissionLayer::new(engine(), Arc::clone(&counters));
        let mut service = layer.layer(tower::service_fn(|_request: Request| async {
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        }));

        service.call(request([10, 0, 0, 1])).await.unwrap();
        let throttled = service.call(request([10, 0, 0, 1])).await.unwrap();

        let bytes = axum::body::to_bytes(throttled.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("Too many requests"));
    }
}
