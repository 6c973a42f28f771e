//! Who is calling: client address and user agent for the audit trail and the
//! rate limiter.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, Extensions, HeaderMap},
};
use helio_core::Actor;

/// Extractor yielding the [`Actor`] behind a request.
///
/// Never rejects: missing headers and a missing peer address produce an
/// anonymous actor.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ClientActor(actor): ClientActor) -> impl IntoResponse {
///     tracing::info!(client = %actor.client_addr, "called");
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for ClientActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientActor(actor_from_parts(&parts.headers, &parts.extensions)))
    }
}

/// Build the actor from request headers and the connection's peer address.
pub fn actor_from_parts(headers: &HeaderMap, extensions: &Extensions) -> Actor {
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Actor::new(client_addr(headers, peer), user_agent)
}

/// Client address: first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// socket peer.
///
/// Forwarding headers are trusted as sent. Deployments must place the
/// service behind a reverse proxy that strips or overwrites them; a client
/// reaching the listener directly can pick its own rate-limit key.
pub fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next().map(str::trim) {
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(
            client_addr(&headers, Some(peer)).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn test_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_addr(&headers, None).as_deref(), Some("198.51.100.2"));

        let peer: SocketAddr = "192.0.2.10:443".parse().unwrap();
        assert_eq!(
            client_addr(&HeaderMap::new(), Some(peer)).as_deref(),
            Some("192.0.2.10")
        );
    }

    #[test]
    fn test_missing_everything_is_anonymous() {
        let actor = actor_from_parts(&HeaderMap::new(), &Extensions::new());
        assert_eq!(actor, Actor::anonymous());
        assert_eq!(actor.client_addr, "anonymous");
    }

    #[test]
    fn test_user_agent_is_recorded() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.4.0"));
        let actor = actor_from_parts(&headers, &Extensions::new());
        assert_eq!(actor.user_agent, "curl/8.4.0");
    }
}
