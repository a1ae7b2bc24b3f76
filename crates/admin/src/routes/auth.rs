//! Console sign-in and sign-out.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{ApiJson, ApiResult, clear_sentry_user, ok, set_sentry_user};
use crate::middleware::{RequireAdmin, clear_current_admin, login_rate_limiter, set_current_admin};
use crate::models::CurrentAdmin;
use crate::services::auth::AdminAuthService;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Build the auth router. Only `login` is reachable without a session, and
/// it is throttled per client.
pub fn router() -> Router<AppState> {
    let credentials = Router::new()
        .route("/auth/login", post(login))
        .layer(login_rate_limiter());

    Router::new()
        .merge(credentials)
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// Log in with email and password; customers are refused.
#[instrument(skip(state, session, body))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<CurrentAdmin> {
    let user = match AdminAuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Admin login failed");
            return Err(e.into());
        }
    };

    let admin = CurrentAdmin::from(&user);
    set_current_admin(&session, &admin).await?;
    set_sentry_user(&admin.id, Some(admin.email.as_str()));
    tracing::info!(admin_id = %admin.id, "Admin logged in");

    ok(admin)
}

/// Log out, destroying the session.
#[instrument(skip(session))]
async fn logout(session: Session) -> ApiResult<bool> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    ok(true)
}

/// The logged-in admin.
#[instrument(skip(admin), fields(admin_id = %admin.id))]
async fn me(RequireAdmin(admin): RequireAdmin) -> ApiResult<CurrentAdmin> {
    ok(admin)
}
