//! Sales dashboard.

use axum::{Router, extract::State, routing::get};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use mistore_db::AnalyticsRepository;
use mistore_db::models::AnalyticsSummary;

use crate::error::{ApiQuery, ApiResult, ok};
use crate::middleware::RequireAdmin;
use crate::services::analytics::ReportRange;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/analytics", get(summary))
}

/// `range=7d|30d|90d|ytd`, or an explicit `from`/`to` pair of days.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[instrument(skip(state, _admin))]
async fn summary(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<AnalyticsQuery>,
) -> ApiResult<AnalyticsSummary> {
    let range = ReportRange::resolve(
        query.range.as_deref(),
        query.from,
        query.to,
        Utc::now().date_naive(),
    )?;
    let (from, to) = range.bounds();
    ok(AnalyticsRepository::new(state.pool())
        .summary(from, to)
        .await?)
}
