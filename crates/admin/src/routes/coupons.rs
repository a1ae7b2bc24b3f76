//! Coupon table and editor.
//!
//! The table is filtered, sorted and paged in memory; a shop has dozens of
//! codes, not thousands.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use mistore_core::api::{ApiResponse, Deleted};
use mistore_core::coupon::CouponState;
use mistore_core::listing::{SortDirection, matches_search, paginate, sort_by_key};
use mistore_core::pagination::{Page, PageRequest};
use mistore_core::validation::FieldErrors;
use mistore_core::{CouponId, CouponType};
use mistore_db::CouponRepository;
use mistore_db::models::{Coupon, CouponInput};

use crate::error::{self, ApiJson, ApiPath, ApiQuery, ApiResult, AppError, created, ok};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(index).post(create))
        .route("/coupons/{id}", get(show).put(update).delete(destroy))
        .route("/coupons/{id}/toggle", post(toggle))
}

/// Coupon table query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CouponQuery {
    /// Code or description.
    pub q: Option<String>,
    /// `active`, `inactive`, `scheduled` or `expired` (includes used up).
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub coupon_type: Option<CouponType>,
    /// `code`, `value`, `used`, `ends` or `created` (default).
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusFilter {
    Active,
    Inactive,
    Scheduled,
    Expired,
}

impl StatusFilter {
    fn parse(value: Option<&str>) -> Result<Option<Self>, FieldErrors> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "active" => Ok(Some(Self::Active)),
            "inactive" => Ok(Some(Self::Inactive)),
            "scheduled" => Ok(Some(Self::Scheduled)),
            "expired" => Ok(Some(Self::Expired)),
            _ => Err(FieldErrors::single(
                "status",
                "must be active, inactive, scheduled or expired",
            )),
        }
    }

    const fn matches(self, state: CouponState) -> bool {
        match self {
            Self::Active => matches!(state, CouponState::Active),
            Self::Inactive => matches!(state, CouponState::Inactive),
            Self::Scheduled => matches!(state, CouponState::Scheduled),
            Self::Expired => matches!(state, CouponState::Expired | CouponState::Exhausted),
        }
    }
}

/// Filter, sort and page the full coupon list.
fn coupon_table(
    coupons: Vec<Coupon>,
    query: &CouponQuery,
    now: DateTime<Utc>,
) -> Result<Page<Coupon>, FieldErrors> {
    let status = StatusFilter::parse(query.status.as_deref())?;

    let mut rows: Vec<Coupon> = coupons
        .into_iter()
        .filter(|c| {
            matches_search(
                query.q.as_deref(),
                &[&c.code, c.description.as_deref().unwrap_or_default()],
            )
        })
        .filter(|c| status.is_none_or(|s| s.matches(c.state(now))))
        .filter(|c| query.coupon_type.is_none_or(|t| c.coupon_type == t))
        .collect();

    let dir = SortDirection::from_param(query.dir.as_deref());
    match query.sort.as_deref().map(str::trim) {
        Some("code") => sort_by_key(&mut rows, dir, |c| c.code.clone()),
        Some("value") => sort_by_key(&mut rows, dir, |c| c.value),
        Some("used" | "used_count") => sort_by_key(&mut rows, dir, |c| c.used_count),
        Some("ends" | "ends_at") => sort_by_key(&mut rows, dir, |c| c.ends_at),
        _ => sort_by_key(&mut rows, dir, |c| (c.created_at, c.id)),
    }

    Ok(paginate(rows, PageRequest::from_params(query.page, query.page_size)))
}

#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<CouponQuery>,
) -> ApiResult<Page<Coupon>> {
    let coupons = CouponRepository::new(state.pool()).list_all().await?;
    ok(coupon_table(coupons, &query, Utc::now())?)
}

#[instrument(skip(state, _admin))]
async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
) -> ApiResult<Coupon> {
    let coupon = CouponRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;
    ok(coupon)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, code = %body.code))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CouponInput>,
) -> error::Result<(StatusCode, Json<ApiResponse<Coupon>>)> {
    body.validate(0)?;
    let coupon = CouponRepository::new(state.pool()).create(&body).await?;
    tracing::info!(coupon_id = %coupon.id, "Coupon created");
    created(coupon)
}

/// Edit a coupon. The usage limit cannot drop below redemptions so far.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
    ApiJson(body): ApiJson<CouponInput>,
) -> ApiResult<Coupon> {
    let coupons = CouponRepository::new(state.pool());
    let existing = coupons
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;
    body.validate(existing.used_count)?;
    ok(coupons.update(id, &body).await?)
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
) -> ApiResult<Deleted> {
    CouponRepository::new(state.pool()).delete(id).await?;
    tracing::info!(coupon_id = %id, "Coupon deleted");
    ok(Deleted { deleted: true })
}

/// Flip `is_active`.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn toggle(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
) -> ApiResult<Coupon> {
    let coupon = CouponRepository::new(state.pool()).toggle_active(id).await?;
    tracing::info!(coupon_id = %id, is_active = coupon.is_active, "Coupon toggled");
    ok(coupon)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()
    }

    fn coupon(id: i32, code: &str) -> Coupon {
        Coupon {
            id: CouponId::new(id),
            code: code.to_string(),
            description: None,
            coupon_type: CouponType::Percentage,
            value: Decimal::from(10),
            min_order_amount: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
            created_at: now() - Duration::days(i64::from(id)),
            updated_at: now(),
        }
    }

    fn fixture() -> Vec<Coupon> {
        let mut off = coupon(2, "PAUSED10");
        off.is_active = false;
        let mut expired = coupon(3, "SUMMER");
        expired.ends_at = Some(now() - Duration::days(1));
        let mut used_up = coupon(4, "FIRST100");
        used_up.usage_limit = Some(100);
        used_up.used_count = 100;
        let mut fixed = coupon(5, "FIVEOFF");
        fixed.coupon_type = CouponType::FixedAmount;
        fixed.value = Decimal::from(5);
        vec![coupon(1, "WELCOME10"), off, expired, used_up, fixed]
    }

    fn codes(page: &Page<Coupon>) -> Vec<&str> {
        page.items.iter().map(|c| c.code.as_str()).collect()
    }

    #[test]
    fn test_default_is_newest_first() {
        let page = coupon_table(fixture(), &CouponQuery::default(), now()).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(codes(&page)[0], "WELCOME10");
    }

    #[test]
    fn test_status_filters() {
        let query = |status: &str| CouponQuery {
            status: Some(status.to_string()),
            ..CouponQuery::default()
        };
        let active = coupon_table(fixture(), &query("active"), now()).unwrap();
        assert_eq!(codes(&active), vec!["WELCOME10", "FIVEOFF"]);

        let inactive = coupon_table(fixture(), &query("inactive"), now()).unwrap();
        assert_eq!(codes(&inactive), vec!["PAUSED10"]);

        let expired = coupon_table(fixture(), &query("expired"), now()).unwrap();
        assert_eq!(codes(&expired), vec!["SUMMER", "FIRST100"]);

        assert!(coupon_table(fixture(), &query("bogus"), now()).is_err());
    }

    #[test]
    fn test_search_type_and_sort() {
        let query = CouponQuery {
            coupon_type: Some(CouponType::Percentage),
            q: Some("0".to_string()),
            sort: Some("code".to_string()),
            dir: Some("asc".to_string()),
            ..CouponQuery::default()
        };
        let page = coupon_table(fixture(), &query, now()).unwrap();
        assert_eq!(codes(&page), vec!["FIRST100", "PAUSED10", "WELCOME10"]);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let query = CouponQuery {
            page: Some(9),
            page_size: Some(2),
            ..CouponQuery::default()
        };
        let page = coupon_table(fixture(), &query, now()).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 5);
    }
}
