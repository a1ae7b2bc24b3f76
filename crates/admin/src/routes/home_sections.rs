//! Home page section editor.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use mistore_core::HomeSectionId;
use mistore_core::api::{ApiResponse, Deleted};
use mistore_core::validation::FieldErrors;
use mistore_db::HomeSectionRepository;
use mistore_db::models::{HomeSection, HomeSectionInput};

use crate::error::{self, ApiJson, ApiPath, ApiResult, created, ok};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/home-sections", get(index).post(create))
        .route("/home-sections/order", put(reorder))
        .route("/home-sections/{id}", put(update).delete(destroy))
}

/// New display order, first to last.
#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    pub ids: Vec<HomeSectionId>,
}

/// All sections including hidden ones, in display order.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<HomeSection>> {
    ok(HomeSectionRepository::new(state.pool()).list(false).await?)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<HomeSectionInput>,
) -> error::Result<(StatusCode, Json<ApiResponse<HomeSection>>)> {
    body.validate()?;
    let section = HomeSectionRepository::new(state.pool()).create(&body).await?;
    tracing::info!(section_id = %section.id, kind = %section.kind, "Home section created");
    created(section)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<HomeSectionId>,
    ApiJson(body): ApiJson<HomeSectionInput>,
) -> ApiResult<HomeSection> {
    body.validate()?;
    ok(HomeSectionRepository::new(state.pool())
        .update(id, &body)
        .await?)
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<HomeSectionId>,
) -> ApiResult<Deleted> {
    HomeSectionRepository::new(state.pool()).delete(id).await?;
    ok(Deleted { deleted: true })
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn reorder(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<ReorderBody>,
) -> ApiResult<Vec<HomeSection>> {
    if body.ids.is_empty() {
        return Err(FieldErrors::single("ids", "must list at least one section").into());
    }
    let sections = HomeSectionRepository::new(state.pool());
    sections.reorder(&body.ids).await?;
    ok(sections.list(false).await?)
}
