//! Login throttling with governor and `tower_governor`.
//!
//! Only `/auth/login` is limited. Everything else needs a staff session
//! already, so a guessing client never gets past the extractor.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::key_extractor::KeyExtractor;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Seconds to earn back one login attempt.
const LOGIN_REPLENISH_SECS: u64 = 12;
/// Attempts allowed back to back before throttling starts.
const LOGIN_BURST: u32 = 5;

/// Keys attempts by client address, trusting the proxy's forwarding headers
/// before the socket peer.
#[derive(Clone, Copy)]
pub struct ConsoleClientKey;

impl KeyExtractor for ConsoleClientKey {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        forwarded_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// `CF-Connecting-IP`, the first `X-Forwarded-For` hop, then `X-Real-IP`.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"]
        .into_iter()
        .find_map(|name| {
            let value = headers.get(name)?.to_str().ok()?;
            value.split(',').next()?.trim().parse().ok()
        })
}

pub type LoginRateLimiter =
    GovernorLayer<ConsoleClientKey, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Five attempts at once, then one every twelve seconds per client.
///
/// # Panics
///
/// Never; both quota values are positive constants.
#[must_use]
pub fn login_rate_limiter() -> LoginRateLimiter {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ConsoleClientKey)
        .per_second(LOGIN_REPLENISH_SECS)
        .burst_size(LOGIN_BURST)
        .finish()
        .expect("login rate limiter quota is positive");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_proxy_headers_win_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.1.0.9"));
        assert_eq!(forwarded_ip(&headers), "10.1.0.9".parse().ok());

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.40, 10.1.0.1"));
        assert_eq!(forwarded_ip(&headers), "203.0.113.40".parse().ok());
    }

    #[test]
    fn test_unparseable_header_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("unknown"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.20"));
        assert_eq!(forwarded_ip(&headers), "198.51.100.20".parse().ok());
    }
}
