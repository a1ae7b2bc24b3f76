//! Delivery address route handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use mistore_core::AddressId;
use mistore_core::api::{ApiResponse, Deleted};
use mistore_db::AddressRepository;
use mistore_db::models::{Address, AddressInput};

use crate::error::{self, ApiJson, ApiPath, ApiResult, created, ok};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// The caller's saved addresses, default first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> ApiResult<Vec<Address>> {
    ok(AddressRepository::new(state.pool()).list_for_user(user.id).await?)
}

/// Save a new address. The first address becomes the default.
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(input): ApiJson<AddressInput>,
) -> error::Result<(StatusCode, Json<ApiResponse<Address>>)> {
    input.validate()?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;
    created(address)
}

/// Delete one of the caller's addresses.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
) -> ApiResult<Deleted> {
    AddressRepository::new(state.pool())
        .delete_for_user(user.id, id)
        .await?;
    ok(Deleted { deleted: true })
}
