//! Order route handlers.
//!
//! Payment is simulated: `pay` moves a pending order to `PAID` with no
//! provider behind it.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use mistore_core::api::ApiResponse;
use mistore_core::pagination::{Page, PageRequest};
use mistore_core::validation::Validator;
use mistore_core::{AddressId, OrderId, OrderStatus, UserId};
use mistore_db::models::{Order, OrderDetail};
use mistore_db::{CheckoutRequest, OrderRepository};

use crate::error::{self, ApiJson, ApiPath, ApiQuery, ApiResult, AppError, created, ok};
use crate::middleware::RequireAuth;
use crate::state::AppState;

const MAX_NOTE_LENGTH: usize = 500;

/// Order history query parameters.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub address_id: AddressId,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// The caller's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> ApiResult<Page<Order>> {
    let page = PageRequest::from_params(query.page, query.page_size);
    ok(OrderRepository::new(state.pool())
        .list_for_user(user.id, page)
        .await?)
}

/// Turn the cart into a pending order.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> error::Result<(StatusCode, Json<ApiResponse<OrderDetail>>)> {
    let note = body.note.as_deref().unwrap_or_default();
    Validator::new()
        .max_len("note", note, MAX_NOTE_LENGTH)
        .finish()?;

    let order = OrderRepository::new(state.pool())
        .checkout(CheckoutRequest {
            user_id: user.id,
            address_id: body.address_id,
            coupon_code: body.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            note: body.note.as_deref(),
            policy: &state.config().pricing,
        })
        .await?;

    created(order)
}

/// One of the caller's orders, with items.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = OrderRepository::new(state.pool())
        .get_detail(id, Some(user.id))
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    ok(order)
}

/// Simulated payment: `PENDING` to `PAID`.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Order> {
    change_status(&state, id, OrderStatus::Paid, user.id).await
}

/// Cancel a pending order, returning its stock and coupon use.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Order> {
    change_status(&state, id, OrderStatus::Cancelled, user.id).await
}

/// Customers may only act on orders that are still pending; paid orders are
/// cancelled by staff.
async fn change_status(
    state: &AppState,
    id: OrderId,
    next: OrderStatus,
    owner: UserId,
) -> ApiResult<Order> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, next, None, Some(owner), Some(OrderStatus::Pending))
        .await?;
    ok(order)
}
