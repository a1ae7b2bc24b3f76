//! Coupon preview route handler.

use axum::extract::State;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mistore_core::coupon::CouponError;
use mistore_core::pricing::OrderTotals;
use mistore_core::CouponType;
use mistore_db::models::CartLine;
use mistore_db::{CartRepository, CouponRepository, RepositoryError};

use crate::error::{ApiJson, ApiResult, ok};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Coupon preview request body.
#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
}

/// What the coupon would do to the caller's current cart.
#[derive(Debug, Clone, Serialize)]
pub struct CouponPreview {
    pub code: String,
    pub description: Option<String>,
    pub coupon_type: CouponType,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Check a coupon against the caller's cart without redeeming it.
///
/// Checkout repeats the check under a row lock, so a preview can still fail
/// at checkout if the last use goes in between.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn validate(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<ValidateCouponRequest>,
) -> ApiResult<CouponPreview> {
    let coupon = CouponRepository::new(state.pool())
        .get_by_code(&body.code)
        .await?
        .ok_or(RepositoryError::Coupon(CouponError::NotFound))?;

    let lines = CartRepository::new(state.pool()).items_for_user(user.id).await?;
    let amounts: Vec<_> = lines.iter().map(CartLine::amount).collect();
    let policy = &state.config().pricing;

    let rules = coupon.rules();
    let before = OrderTotals::compute(&amounts, None, policy);
    rules
        .check_eligibility(Utc::now(), before.subtotal)
        .map_err(RepositoryError::Coupon)?;
    let totals = OrderTotals::compute(&amounts, Some(&rules), policy);

    ok(CouponPreview {
        code: coupon.code,
        description: coupon.description,
        coupon_type: coupon.coupon_type,
        subtotal: totals.subtotal,
        shipping_fee: totals.shipping_fee,
        discount: totals.discount,
        total: totals.total,
    })
}
