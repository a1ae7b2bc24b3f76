//! Cart route handlers.
//!
//! Carts are server-side, one row per (user, product). Every mutation answers
//! with the whole recalculated cart so the client never prices anything.

use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mistore_core::ProductId;
use mistore_core::pricing::PricingPolicy;
use mistore_core::round_money;
use mistore_core::validation::Validator;
use mistore_db::CartRepository;
use mistore_db::models::CartLine;

use crate::error::{ApiJson, ApiPath, ApiResult, ok};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Most of one product a cart may hold.
const MAX_LINE_QUANTITY: i32 = 99;

/// A cart line with its total.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Decimal,
    /// Why the line cannot be checked out, if anything.
    pub problem: Option<String>,
}

/// The priced cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: i32,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    /// Every line can be checked out.
    pub can_checkout: bool,
}

impl CartView {
    /// Price cart lines. Coupons are only applied at checkout.
    #[must_use]
    pub fn build(lines: Vec<CartLine>, policy: &PricingPolicy) -> Self {
        let subtotal = round_money(lines.iter().map(CartLine::line_total).sum());
        let shipping_fee = policy.shipping_for(subtotal);
        let item_count = lines.iter().map(|l| l.quantity).sum();

        let items: Vec<CartLineView> = lines
            .into_iter()
            .map(|line| CartLineView {
                line_total: line.line_total(),
                problem: line.problem(),
                line,
            })
            .collect();
        let can_checkout = !items.is_empty() && items.iter().all(|i| i.problem.is_none());

        Self {
            items,
            item_count,
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
            can_checkout,
        }
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Quantity change request body.
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

/// Show the caller's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> ApiResult<CartView> {
    let lines = CartRepository::new(state.pool()).items_for_user(user.id).await?;
    ok(CartView::build(lines, &state.config().pricing))
}

/// Add a product, or add to its quantity if already in the cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id, product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> ApiResult<CartView> {
    Validator::new()
        .range("quantity", body.quantity, Some(1), Some(MAX_LINE_QUANTITY))
        .finish()?;

    let lines = CartRepository::new(state.pool())
        .upsert_item(user.id, body.product_id, body.quantity)
        .await?;
    ok(CartView::build(lines, &state.config().pricing))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<SetQuantityRequest>,
) -> ApiResult<CartView> {
    Validator::new()
        .range("quantity", body.quantity, Some(0), Some(MAX_LINE_QUANTITY))
        .finish()?;

    let lines = CartRepository::new(state.pool())
        .set_quantity(user.id, product_id, body.quantity)
        .await?;
    ok(CartView::build(lines, &state.config().pricing))
}

/// Remove a line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> ApiResult<CartView> {
    let lines = CartRepository::new(state.pool())
        .remove_item(user.id, product_id)
        .await?;
    ok(CartView::build(lines, &state.config().pricing))
}

/// Empty the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> ApiResult<CartView> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    ok(CartView::build(Vec::new(), &state.config().pricing))
}
