//! Unified error handling for admin.
//!
//! Same JSON envelope as the storefront. Server-side failures go to Sentry
//! and never leak details to the console.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        multipart::MultipartError,
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

use crate::services::auth::AdminAuthError;
use crate::services::upload::UploadError;

/// Application-level error type for the admin console.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Admin login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    /// Request body failed field validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] FieldErrors),

    /// Image upload refused.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body over the configured limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(RepositoryError::Database(_) | RepositoryError::DataCorruption(_))
                | Self::Auth(AdminAuthError::Repository(_) | AdminAuthError::PasswordHash)
                | Self::Session(_)
                | Self::Internal(_)
        )
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(AdminAuthError::NotAdmin) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Auth(AdminAuthError::WeakPassword(_)) | Self::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Auth(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Upload(UploadError::TooLarge { .. }) | Self::PayloadTooLarge(_) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Upload(UploadError::UnsupportedType) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Upload(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

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
            Self::Auth(AdminAuthError::WeakPassword(msg)) => {
                ApiError::validation(FieldErrors::single("password", msg))
            }
            Self::Auth(AdminAuthError::NotAdmin) => ApiError::new("Admin access required"),
            Self::Auth(_) => ApiError::new("Invalid email or password"),
            Self::Upload(err) => ApiError::new(err.to_string()),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::PayloadTooLarge(msg) => ApiError::new(msg),
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
        // Log server errors with Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        } else {
            tracing::debug!(error = %self, "Admin request rejected");
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

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
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

/// JSON success envelope or an error.
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

/// Set the Sentry user context from an admin user.
pub fn set_sentry_user(admin_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AdminAuthError::NotAdmin)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AdminAuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Upload(UploadError::TooLarge { limit: 10 })),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(AppError::Upload(UploadError::UnsupportedType)),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("slug".to_string()))),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_not_admin_body() {
        let response = AppError::Auth(AdminAuthError::NotAdmin).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Admin access required");
    }
}
