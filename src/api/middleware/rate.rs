//! Per-client rate limiting middleware.
//!
//! Applies sliding-window rate limits per client address:
//! - 100 requests per minute
//! - 1000 requests per hour
//!
//! The client address is the TCP peer. `X-Forwarded-For` is only honored
//! when the context trusts it, i.e. behind a proxy that overwrites it.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Rate-limit key: the peer address, or the first `X-Forwarded-For` hop
/// when `trust_forwarded_for` is set.
fn rate_key(req: &Request<axum::body::Body>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return format!("ip:{ip}");
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Returns 429 with `Retry-After` once a client exceeds its window.
/// Accesses `ApiContext` from request extensions.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = rate_key(&req, ctx.trust_forwarded_for);

    // MutexGuard is !Send, drop before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&key).map_err(|retry_after| {
            tracing::warn!(client = %key, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }
        })?;
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn forwarded(peer: [u8; 4], header: &str) -> Request<Body> {
        let mut req = Request::builder()
            .header("X-Forwarded-For", header)
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
        req
    }

    #[test]
    fn forwarded_header_ignored_unless_trusted() {
        let req = forwarded([192, 168, 1, 5], "10.0.0.7, 172.16.0.1");
        assert_eq!(rate_key(&req, false), "ip:192.168.1.5");
    }

    #[test]
    fn trusted_forwarded_header_uses_first_hop() {
        let req = forwarded([192, 168, 1, 5], "10.0.0.7, 172.16.0.1");
        assert_eq!(rate_key(&req, true), "ip:10.0.0.7");

        let blank = forwarded([192, 168, 1, 5], " ");
        assert_eq!(rate_key(&blank, true), "ip:192.168.1.5");
    }

    #[test]
    fn peer_address_then_anonymous() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(rate_key(&req, false), "anonymous");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        assert_eq!(rate_key(&req, false), "ip:127.0.0.1");
    }
}
