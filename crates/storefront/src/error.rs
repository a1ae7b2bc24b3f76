//! Unified error handling with Sentry integration.
//!
//! Every handler returns [`ApiResult`]. Errors render as the JSON failure
//! envelope; server-side failures are captured to Sentry first and their
//! details never reach the client.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use mistore_core::api::{ApiError, ApiResponse};
use mistore_core::validation::FieldErrors;
use mistore_db::RepositoryError;

use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Request body failed field validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] FieldErrors),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(RepositoryError::Database(_) | RepositoryError::DataCorruption(_))
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Session(_)
                | Self::Internal(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) | AuthError::InvalidName(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body. Internal details stay in the logs.
    fn body(self) -> ApiError {
        if self.is_server_error() {
            return ApiError::new("Internal server error");
        }
        match self {
            Self::Validation(fields) => ApiError::validation(fields),
            Self::Database(RepositoryError::Odds(e)) => {
                ApiError::validation(FieldErrors::single("probability_bp", e.to_string()))
            }
            Self::Database(RepositoryError::NotFound) => ApiError::new("Not found"),
            Self::Database(RepositoryError::Conflict(msg) | RepositoryError::Rejected(msg)) => {
                ApiError::new(msg)
            }
            Self::Database(other) => ApiError::new(other.to_string()),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => ApiError::new("Invalid email or password"),
                AuthError::UserAlreadyExists => {
                    ApiError::new("An account with this email already exists")
                }
                AuthError::InvalidEmail(_) => {
                    ApiError::validation(FieldErrors::single("email", "is not a valid email address"))
                }
                AuthError::WeakPassword(msg) => ApiError::validation(FieldErrors::single("password", msg)),
                AuthError::InvalidName(msg) => ApiError::validation(FieldErrors::single("name", msg)),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    ApiError::new("Internal server error")
                }
            },
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => {
                ApiError::new(msg)
            }
            Self::Session(_) | Self::Internal(_) => ApiError::new("Internal server error"),
        }
    }
}

/// HTTP status for a repository failure.
#[must_use]
pub const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) | RepositoryError::Transition(_) => StatusCode::CONFLICT,
        RepositoryError::Rejected(_) | RepositoryError::Coupon(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Odds(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// `Json` whose rejection is an [`AppError`] envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection is an [`AppError`] envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejection is an [`AppError`] envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// What handlers return: a JSON success envelope or an error.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>>;

/// Wrap `data` in the success envelope.
#[allow(clippy::unnecessary_wraps)]
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

/// Success envelope with `201 Created`.
#[allow(clippy::unnecessary_wraps)]
pub fn created<T: Serialize>(data: T) -> Result<(StatusCode, Json<ApiResponse<T>>)> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data))))
}

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mistore_core::coupon::CouponError;
    use mistore_core::lottery::OddsError;
    use mistore_core::{OrderStatus, TransitionError};

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_repository_status_codes() {
        assert_eq!(repository_status(&RepositoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            repository_status(&RepositoryError::Conflict("slug taken".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            repository_status(&RepositoryError::Coupon(CouponError::Expired)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            repository_status(&RepositoryError::Transition(TransitionError {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            repository_status(&RepositoryError::Odds(OddsError::SumExceeded(12_000))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_json(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_envelope_has_fields() {
        let (status, body) =
            body_json(AppError::Validation(FieldErrors::single("quantity", "must be at least 1")))
                .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"]["quantity"][0], "must be at least 1");
    }

    #[tokio::test]
    async fn test_weak_password_maps_to_field() {
        let (status, body) =
            body_json(AppError::Auth(AuthError::WeakPassword("must be at least 8 characters".into())))
                .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["password"].is_array());
    }

    #[tokio::test]
    async fn test_coupon_error_message_reaches_client() {
        let (status, body) =
            body_json(AppError::Database(RepositoryError::Coupon(CouponError::Expired))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "coupon has expired");
    }
}
