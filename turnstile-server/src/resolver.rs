//! Client identity resolution
//!
//! Derives the [`ClientKey`] a request is throttled under. Resolution is
//! total: it never fails and has no side effects. When no address can be
//! determined, the sentinel key keeps the admission path working instead of
//! failing closed on missing metadata.

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};
use turnstile::ClientKey;

/// Resolves a stable client key from request metadata
///
/// By default the key is the peer address captured at accept time. When the
/// server sits behind a reverse proxy the peer address is the proxy itself,
/// so the operator can opt into trusting the first `X-Forwarded-For` hop.
/// That header is client-controlled on an open port; never enable it without
/// a proxy that overwrites it.
#[derive(Debug, Clone)]
pub struct ClientResolver {
    trust_forwarded: bool,
}

impl ClientResolver {
    pub fn new(trust_forwarded: bool) -> Self {
        ClientResolver { trust_forwarded }
    }

    /// Derive the client key for a request
    ///
    /// Equal requests from the same client produce equal keys. Returns the
    /// sentinel key when neither a forwarded hop nor a peer address is
    /// available.
    pub fn resolve(&self, request: &Request) -> ClientKey {
        if self.trust_forwarded {
            if let Some(key) = forwarded_client(request.headers()) {
                return key;
            }
        }

        if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
            return ClientKey::from(addr.ip().to_string());
        }

        ClientKey::unknown()
    }
}

/// First hop of X-Forwarded-For, normalized to a bare IP when well-formed
fn forwarded_client(headers: &HeaderMap) -> Option<ClientKey> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }

    // A malformed hop still yields a deterministic key.
    match first.parse::<IpAddr>() {
        Ok(ip) => Some(ClientKey::from(ip.to_string())),
        Err(_) => Some(ClientKey::from(first)),
    }
}
