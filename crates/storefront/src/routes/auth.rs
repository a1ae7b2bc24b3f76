//! Authentication route handlers.
//!
//! Registration logs the new customer straight in. Login and registration
//! sit behind the strict auth rate limiter.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use mistore_core::api::ApiResponse;
use mistore_db::UserRepository;

use crate::error::{
    self, ApiJson, ApiResult, AppError, clear_sentry_user, created, ok, set_sentry_user,
};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create a customer account and log it in.
#[instrument(skip(state, session, body))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> error::Result<(StatusCode, Json<ApiResponse<CurrentUser>>)> {
    let user = AuthService::new(state.pool())
        .register(&body.email, &body.name, &body.password)
        .await?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));

    created(current)
}

/// Log in with email and password.
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<CurrentUser> {
    let user = match AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Err(e.into());
        }
    };

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    tracing::info!(user_id = %current.id, "Customer logged in");

    ok(current)
}

/// Log out, destroying the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> ApiResult<bool> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    ok(true)
}

/// The logged-in user, refreshed from the database so role changes show up.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> ApiResult<CurrentUser> {
    let Some(fresh) = UserRepository::new(state.pool()).get_by_id(user.id).await? else {
        clear_current_user(&session).await?;
        return Err(AppError::Unauthorized("Login required".to_string()));
    };

    let current = CurrentUser::from(&fresh);
    if current != user {
        set_current_user(&session, &current).await?;
    }
    ok(current)
}
