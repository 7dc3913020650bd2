//! User-agent capture
//!
//! Attaches the caller's user agent to the request as an extension so
//! downstream handlers can read it without re-parsing headers.

use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

/// Extension carrying the caller's User-Agent header value
#[derive(Debug, Clone)]
pub struct UserAgent(pub String);

/// Middleware inserting a [`UserAgent`] extension into every request
pub async fn capture_user_agent(mut request: Request, next: Next) -> Response {
    let agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    tracing::trace!(user_agent = %agent, method = %request.method(), uri = %request.uri(), "inbound request");
    request.extensions_mut().insert(UserAgent(agent));

    next.run(request).await
}
