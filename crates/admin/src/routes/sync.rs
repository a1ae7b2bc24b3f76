//! Change feeds for clients that mirror orders and products.
//!
//! Items come in `(updated_at, id)` order, capped per call. Clients pass the
//! returned `next` back as `since` and `after_id`. While `has_more` is true
//! they should poll again straight away.

use axum::{Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mistore_db::models::{ChangeCursor, OrderSummary, Product};
use mistore_db::{OrderRepository, ProductRepository};

use crate::error::{ApiQuery, ApiResult, ok};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const SYNC_BATCH: usize = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync/orders", get(orders))
        .route("/sync/products", get(products))
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    /// RFC 3339 timestamp; encode `+` offsets or use `Z`. Missing means
    /// everything.
    pub since: Option<DateTime<Utc>>,
    /// Last id already seen at exactly `since`.
    pub after_id: Option<i32>,
}

impl SyncQuery {
    fn cursor(&self) -> ChangeCursor {
        self.since.map_or(ChangeCursor::START, |since| {
            ChangeCursor::new(since, self.after_id.unwrap_or(0))
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SyncBatch<T> {
    pub server_time: DateTime<Utc>,
    pub items: Vec<T>,
    pub next: ChangeCursor,
    pub has_more: bool,
}

impl<T> SyncBatch<T> {
    /// Wrap one page of the feed.
    ///
    /// A full page continues from its last row, since rows after it may
    /// share timestamps older than `server_time`. A short page means the
    /// feed is drained up to `server_time`, read before the query.
    fn new(
        items: Vec<T>,
        server_time: DateTime<Utc>,
        key: impl Fn(&T) -> ChangeCursor,
    ) -> Self {
        let has_more = items.len() >= SYNC_BATCH;
        let next = match items.last() {
            Some(last) if has_more => key(last),
            _ => ChangeCursor::new(server_time, 0),
        };
        Self {
            server_time,
            items,
            next,
            has_more,
        }
    }
}

fn batch_limit() -> i64 {
    i64::try_from(SYNC_BATCH).unwrap_or(i64::MAX)
}

#[instrument(skip(state, _admin))]
async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<SyncQuery>,
) -> ApiResult<SyncBatch<OrderSummary>> {
    let server_time = Utc::now();
    let items = OrderRepository::new(state.pool())
        .updated_since(query.cursor(), batch_limit())
        .await?;
    ok(SyncBatch::new(items, server_time, |o| {
        ChangeCursor::new(o.updated_at, o.id.as_i32())
    }))
}

#[instrument(skip(state, _admin))]
async fn products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<SyncQuery>,
) -> ApiResult<SyncBatch<Product>> {
    let server_time = Utc::now();
    let items = ProductRepository::new(state.pool())
        .updated_since(query.cursor(), batch_limit())
        .await?;
    ok(SyncBatch::new(items, server_time, |p| {
        ChangeCursor::new(p.updated_at, p.id.as_i32())
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    /// Rows as `(updated_at, id)`, filtered and limited like the repositories.
    fn page(rows: &[ChangeCursor], after: ChangeCursor) -> Vec<ChangeCursor> {
        let mut found: Vec<_> = rows.iter().copied().filter(|r| *r > after).collect();
        found.sort();
        found.truncate(SYNC_BATCH);
        found
    }

    #[test]
    fn test_since_parses_rfc3339() {
        let query: SyncQuery =
            serde_json::from_str(r#"{"since":"2026-10-01T08:30:00+01:00","after_id":12}"#).unwrap();
        let cursor = query.cursor();
        assert_eq!(cursor.since.to_rfc3339(), "2026-10-01T07:30:00+00:00");
        assert_eq!(cursor.after_id, 12);
    }

    #[test]
    fn test_missing_since_means_everything() {
        let query = SyncQuery {
            since: None,
            after_id: Some(40),
        };
        assert_eq!(query.cursor(), ChangeCursor::START);
    }

    #[test]
    fn test_short_batch_resumes_at_server_time() {
        let now = Utc.with_ymd_and_hms(2026, 10, 2, 9, 0, 0).unwrap();
        let batch = SyncBatch::new(vec![ChangeCursor::new(now, 3)], now, |c| *c);
        assert!(!batch.has_more);
        assert_eq!(batch.next, ChangeCursor::new(now, 0));
    }

    #[test]
    fn test_bulk_update_is_delivered_across_batches() {
        // 1200 rows touched by one bulk update share two timestamps
        let first = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        let second = first + chrono::TimeDelta::milliseconds(1);
        let rows: Vec<ChangeCursor> = (1..=1200)
            .map(|id| ChangeCursor::new(if id <= 700 { first } else { second }, id))
            .collect();
        let server_time = second + chrono::TimeDelta::seconds(5);

        let mut cursor = ChangeCursor::START;
        let mut delivered = Vec::new();
        for _ in 0..10 {
            let batch = SyncBatch::new(page(&rows, cursor), server_time, |c| *c);
            delivered.extend(batch.items.iter().map(|c| c.after_id));
            cursor = batch.next;
            if !batch.has_more {
                break;
            }
        }

        delivered.sort_unstable();
        delivered.dedup();
        assert_eq!(delivered.len(), 1200);
        assert_eq!(cursor, ChangeCursor::new(server_time, 0));
    }
}
