//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an upstream `x-request-id` when it looks sane, otherwise generates
//! a UUID v4. The ID is recorded on the tracing span, tagged on the Sentry
//! scope and echoed in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_UPSTREAM_ID_LEN: usize = 128;

/// Middleware that ensures every request has a unique request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = upstream_id(request.headers().get(REQUEST_ID_HEADER))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Accept an upstream ID only if it is short printable ASCII.
fn upstream_id(header: Option<&HeaderValue>) -> Option<String> {
    let value = header?.to_str().ok()?.trim();
    let acceptable = !value.is_empty()
        && value.len() <= MAX_UPSTREAM_ID_LEN
        && value.chars().all(|c| c.is_ascii_graphic());
    acceptable.then(|| value.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_accepted() {
        let header = HeaderValue::from_static("cf-8a1b2c3d");
        assert_eq!(upstream_id(Some(&header)).as_deref(), Some("cf-8a1b2c3d"));
    }

    #[test]
    fn test_upstream_id_rejected() {
        assert_eq!(upstream_id(None), None);
        assert_eq!(upstream_id(Some(&HeaderValue::from_static("has space"))), None);
        let long = "a".repeat(MAX_UPSTREAM_ID_LEN + 1);
        assert_eq!(upstream_id(Some(&HeaderValue::from_str(&long).unwrap())), None);
    }
}
