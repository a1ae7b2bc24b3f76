//! Category editor.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;

use mistore_core::CategoryId;
use mistore_core::api::{ApiResponse, Deleted};
use mistore_db::CategoryRepository;
use mistore_db::models::{Category, CategoryInput};

use crate::error::{self, ApiJson, ApiPath, ApiResult, created, ok};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(index).post(create))
        .route("/categories/{id}", put(update).delete(destroy))
}

#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<Category>> {
    ok(CategoryRepository::new(state.pool()).list().await?)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CategoryInput>,
) -> error::Result<(StatusCode, Json<ApiResponse<Category>>)> {
    body.validate()?;
    let category = CategoryRepository::new(state.pool()).create(&body).await?;
    tracing::info!(category_id = %category.id, "Category created");
    created(category)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(body): ApiJson<CategoryInput>,
) -> ApiResult<Category> {
    body.validate()?;
    ok(CategoryRepository::new(state.pool()).update(id, &body).await?)
}

/// Delete an empty category.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
) -> ApiResult<Deleted> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    tracing::info!(category_id = %id, "Category deleted");
    ok(Deleted { deleted: true })
}
