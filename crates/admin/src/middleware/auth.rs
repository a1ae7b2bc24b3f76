//! Authentication middleware and extractors for admin.
//!
//! Every protected handler takes [`RequireAdmin`]. Besides the session it
//! re-checks the user row, so a demoted or deleted admin loses access on
//! their next request rather than when the session expires.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use mistore_db::UserRepository;

use crate::error::AppError;
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(admin): RequireAdmin) -> ApiResult<String> {
///     ok(format!("Hello, {}!", admin.name))
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))?;

        let admin: CurrentAdmin = session
            .get(session_keys::CURRENT_ADMIN)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))?;

        let still_admin = UserRepository::new(state.pool())
            .get_by_id(admin.id)
            .await?
            .is_some_and(|user| user.is_admin());

        if !still_admin {
            tracing::warn!(user_id = %admin.id, "Admin session for a user who lost the role");
            session.flush().await?;
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(Self(admin))
    }
}

/// Store the logged-in admin, rotating the session ID first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Clear the session entirely (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
