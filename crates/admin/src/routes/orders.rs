//! Order table and fulfilment.

use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use mistore_core::pagination::{Page, PageRequest};
use mistore_core::validation::{FieldErrors, Validator};
use mistore_core::{OrderId, OrderStatus};
use mistore_db::OrderRepository;
use mistore_db::models::{Order, OrderDetail, OrderFilter, OrderOrder, OrderSummary};

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult, AppError, ok};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const MAX_TRACKING_LENGTH: usize = 64;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/{id}", get(show))
        .route("/orders/{id}/status", patch(update_status))
}

/// Order table query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    /// Order number, customer email or name.
    pub q: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl OrderQuery {
    fn filter(&self) -> Result<OrderFilter, FieldErrors> {
        if matches!((self.from, self.to), (Some(from), Some(to)) if from > to) {
            return Err(FieldErrors::single("from", "must not be after to"));
        }
        Ok(OrderFilter {
            status: self.status,
            q: self.q.clone(),
            from: self.from,
            to: self.to,
            user_id: None,
        })
    }
}

/// Status change body. SCREAMING case on the wire, e.g. `"SHIPPED"`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Page<OrderSummary>> {
    let filter = query.filter()?;
    let order = OrderOrder::parse(query.sort.as_deref(), query.dir.as_deref());
    let page = PageRequest::from_params(query.page, query.page_size);
    ok(OrderRepository::new(state.pool())
        .list(&filter, order, page)
        .await?)
}

/// Any customer's order with items.
#[instrument(skip(state, _admin))]
async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = OrderRepository::new(state.pool())
        .get_detail(id, None)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    ok(order)
}

/// Move an order along its lifecycle. Illegal jumps are a 409.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, to = %body.status))]
async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Order> {
    let tracking = body.tracking_number.as_deref().map(str::trim);
    Validator::new()
        .max_len("tracking_number", tracking.unwrap_or_default(), MAX_TRACKING_LENGTH)
        .finish()?;

    let order = OrderRepository::new(state.pool())
        .update_status(id, body.status, tracking, None, None)
        .await?;
    ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_dates_rejected() {
        let query = OrderQuery {
            from: NaiveDate::from_ymd_opt(2026, 3, 2),
            to: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..OrderQuery::default()
        };
        assert!(query.filter().is_err());
    }

    #[test]
    fn test_filter_never_scopes_to_a_user() {
        let query = OrderQuery {
            status: Some(OrderStatus::Paid),
            ..OrderQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Paid));
        assert!(filter.user_id.is_none());
    }

    #[test]
    fn test_status_body_is_screaming_case() {
        let body: StatusUpdate =
            serde_json::from_str(r#"{"status":"SHIPPED","tracking_number":"RM123"}"#).unwrap();
        assert_eq!(body.status, OrderStatus::Shipped);
        assert!(serde_json::from_str::<StatusUpdate>(r#"{"status":"shipped"}"#).is_err());
    }
}
