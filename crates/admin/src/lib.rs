//! Mi Store admin console library.
//!
//! The staff-only JSON API as a library, so the router can be built and
//! exercised in tests without a listener.
//!
//! # Security
//!
//! Every API route except login requires a session belonging to a user
//! whose role is still `admin` at request time. Sessions are kept apart
//! from customer sessions and use a SameSite=Strict cookie.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Build the full admin application.
///
/// Layers, innermost first: sessions, security headers, request ID, request
/// span, then the Sentry hub and transaction layers.
pub fn app<Store>(state: AppState, session_layer: SessionManagerLayer<Store>) -> Router
where
    Store: SessionStore + Clone,
{
    routes::routes(state.config().max_upload_bytes)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;
    use url::Url;

    use super::*;
    use crate::config::{AdminConfig, SentryConfig};

    /// A router whose pool never connects; only requests turned away before
    /// the database are exercised.
    fn test_app() -> Router {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/mistore_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: Url::parse("http://localhost:3001").unwrap(),
            session_secret: SecretString::from("k".repeat(32)),
            max_upload_bytes: 1024,
            json_logs: false,
            sentry: SentryConfig::default(),
            tls: None,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/mistore_test")
            .unwrap();
        let state = AppState::new(config, pool);
        app(state, SessionManagerLayer::new(MemoryStore::default()))
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        request_from("192.0.2.10", method, uri, body)
    }

    fn request_from(client_ip: &str, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", client_ip);
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_has_strict_headers() {
        let response = test_app()
            .oneshot(request("GET", "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["cache-control"], "no-store");
        assert!(response.headers().contains_key("strict-transport-security"));
    }

    #[tokio::test]
    async fn test_api_requires_admin_session() {
        for uri in [
            "/api/admin/products",
            "/api/admin/orders",
            "/api/admin/coupons",
            "/api/admin/analytics",
            "/api/admin/auth/me",
        ] {
            let response = test_app().oneshot(request("GET", uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            let body = json_body(response).await;
            assert_eq!(body["error"], "Login required");
        }
    }

    #[tokio::test]
    async fn test_login_with_malformed_email() {
        let response = test_app()
            .oneshot(request(
                "POST",
                "/api/admin/auth/login",
                Some(serde_json::json!({
                    "email": "not-an-email",
                    "password": "whatever-it-is",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_login_with_missing_fields() {
        let response = test_app()
            .oneshot(request(
                "POST",
                "/api/admin/auth/login",
                Some(serde_json::json!({ "email": "ada@example.com" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_is_throttled_per_client() {
        let app = test_app();
        let attempt = |ip: &str| {
            request_from(
                ip,
                "POST",
                "/api/admin/auth/login",
                Some(serde_json::json!({ "email": "nobody", "password": "guess" })),
            )
        };

        for _ in 0..5 {
            let response = app.clone().oneshot(attempt("203.0.113.5")).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        let response = app.clone().oneshot(attempt("203.0.113.5")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // Another client still gets through
        let response = app.oneshot(attempt("203.0.113.6")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
