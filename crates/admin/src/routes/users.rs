//! Customer and staff accounts.

use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use mistore_core::pagination::{Page, PageRequest};
use mistore_core::{UserId, UserRole};
use mistore_db::UserRepository;
use mistore_db::models::{User, UserFilter, UserSummary};

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult, AppError, ok};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index))
        .route("/users/{id}/role", patch(set_role))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    /// Email or name.
    pub q: Option<String>,
    pub role: Option<UserRole>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: UserRole,
}

#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<Page<UserSummary>> {
    let filter = UserFilter {
        q: query.q,
        role: query.role,
    };
    let page = PageRequest::from_params(query.page, query.page_size);
    ok(UserRepository::new(state.pool()).list(&filter, page).await?)
}

/// Grant or revoke admin. Admins cannot demote themselves.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, role = %body.role))]
async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<RoleBody>,
) -> ApiResult<User> {
    if id == admin.id && body.role != UserRole::Admin {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .set_role(id, body.role)
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, "User role changed");
    ok(user)
}
