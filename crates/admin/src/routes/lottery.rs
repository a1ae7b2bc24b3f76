//! Lottery activities, their prize tables and draw history.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, put},
};
use serde::Deserialize;
use tracing::instrument;

use mistore_core::api::{ApiResponse, Deleted};
use mistore_core::listing::{SortDirection, matches_search, paginate, sort_by_key};
use mistore_core::pagination::{Page, PageRequest};
use mistore_core::{LotteryActivityId, LotteryPrizeId, LotteryStatus};
use mistore_db::LotteryRepository;
use mistore_db::models::{
    LotteryActivity, LotteryActivityInput, LotteryDraw, LotteryPrize, LotteryPrizeInput,
};

use crate::error::{self, ApiJson, ApiPath, ApiQuery, ApiResult, AppError, created, ok};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const DEFAULT_DRAW_LIMIT: i64 = 100;
const MAX_DRAW_LIMIT: i64 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/lottery", get(index).post(create))
        .route("/lottery/{id}", get(show).put(update).delete(destroy))
        .route("/lottery/{id}/status", patch(set_status))
        .route("/lottery/{id}/prizes", get(prizes).post(create_prize))
        .route(
            "/lottery/{id}/prizes/{prize_id}",
            put(update_prize).delete(destroy_prize),
        )
        .route("/lottery/{id}/draws", get(draws))
}

/// Activity table query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub q: Option<String>,
    pub status: Option<LotteryStatus>,
    /// `name`, `starts`, `ends`, `draws` or `created` (default).
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: LotteryStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct DrawQuery {
    pub limit: Option<i64>,
}

fn activity_table(activities: Vec<LotteryActivity>, query: &ActivityQuery) -> Page<LotteryActivity> {
    let mut rows: Vec<LotteryActivity> = activities
        .into_iter()
        .filter(|a| {
            matches_search(
                query.q.as_deref(),
                &[&a.name, a.description.as_deref().unwrap_or_default()],
            )
        })
        .filter(|a| query.status.is_none_or(|s| a.status == s))
        .collect();

    let dir = SortDirection::from_param(query.dir.as_deref());
    match query.sort.as_deref().map(str::trim) {
        Some("name") => sort_by_key(&mut rows, dir, |a| a.name.to_lowercase()),
        Some("starts" | "starts_at") => sort_by_key(&mut rows, dir, |a| a.starts_at),
        Some("ends" | "ends_at") => sort_by_key(&mut rows, dir, |a| a.ends_at),
        Some("draws" | "draw_count") => sort_by_key(&mut rows, dir, |a| a.draw_count),
        _ => sort_by_key(&mut rows, dir, |a| (a.created_at, a.id)),
    }

    paginate(rows, PageRequest::from_params(query.page, query.page_size))
}

#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Page<LotteryActivity>> {
    let activities = LotteryRepository::new(state.pool()).list_activities().await?;
    ok(activity_table(activities, &query))
}

#[instrument(skip(state, _admin))]
async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<LotteryActivityId>,
) -> ApiResult<LotteryActivity> {
    let activity = LotteryRepository::new(state.pool())
        .get_activity(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lottery activity not found".to_string()))?;
    ok(activity)
}

/// New activities start as drafts.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<LotteryActivityInput>,
) -> error::Result<(StatusCode, Json<ApiResponse<LotteryActivity>>)> {
    body.validate()?;
    let activity = LotteryRepository::new(state.pool())
        .create_activity(&body)
        .await?;
    tracing::info!(activity_id = %activity.id, "Lottery activity created");
    created(activity)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<LotteryActivityId>,
    ApiJson(body): ApiJson<LotteryActivityInput>,
) -> ApiResult<LotteryActivity> {
    body.validate()?;
    ok(LotteryRepository::new(state.pool())
        .update_activity(id, &body)
        .await?)
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<LotteryActivityId>,
) -> ApiResult<Deleted> {
    LotteryRepository::new(state.pool()).delete_activity(id).await?;
    tracing::info!(activity_id = %id, "Lottery activity deleted");
    ok(Deleted { deleted: true })
}

/// Activate, end or return an activity to draft.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, status = %body.status))]
async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<LotteryActivityId>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<LotteryActivity> {
    let activity = LotteryRepository::new(state.pool())
        .set_status(id, body.status)
        .await?;
    tracing::info!(activity_id = %id, status = %activity.status, "Lottery status changed");
    ok(activity)
}

#[instrument(skip(state, _admin))]
async fn prizes(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<LotteryActivityId>,
) -> ApiResult<Vec<LotteryPrize>> {
    let lottery = LotteryRepository::new(state.pool());
    if lottery.get_activity(id).await?.is_none() {
        return Err(AppError::NotFound("Lottery activity not found".to_string()));
    }
    ok(lottery.list_prizes(id).await?)
}

/// Add a prize. Odds across the activity may not exceed 100%.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn create_prize(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<LotteryActivityId>,
    ApiJson(body): ApiJson<LotteryPrizeInput>,
) -> error::Result<(StatusCode, Json<ApiResponse<LotteryPrize>>)> {
    body.validate()?;
    let prize = LotteryRepository::new(state.pool())
        .create_prize(id, &body)
        .await?;
    created(prize)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update_prize(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath((id, prize_id)): ApiPath<(LotteryActivityId, LotteryPrizeId)>,
    ApiJson(body): ApiJson<LotteryPrizeInput>,
) -> ApiResult<LotteryPrize> {
    body.validate()?;
    ok(LotteryRepository::new(state.pool())
        .update_prize(id, prize_id, &body)
        .await?)
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn destroy_prize(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath((id, prize_id)): ApiPath<(LotteryActivityId, LotteryPrizeId)>,
) -> ApiResult<Deleted> {
    LotteryRepository::new(state.pool())
        .delete_prize(id, prize_id)
        .await?;
    ok(Deleted { deleted: true })
}

/// Most recent draws first.
#[instrument(skip(state, _admin))]
async fn draws(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<LotteryActivityId>,
    ApiQuery(query): ApiQuery<DrawQuery>,
) -> ApiResult<Vec<LotteryDraw>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_DRAW_LIMIT)
        .clamp(1, MAX_DRAW_LIMIT);
    ok(LotteryRepository::new(state.pool())
        .draws_for_activity(id, limit)
        .await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()
    }

    fn activity(id: i32, name: &str, status: LotteryStatus, draws: i64) -> LotteryActivity {
        LotteryActivity {
            id: LotteryActivityId::new(id),
            name: name.to_string(),
            description: None,
            status,
            starts_at: base(),
            ends_at: base() + Duration::days(30),
            max_draws_per_user: 1,
            prize_count: 3,
            draw_count: draws,
            created_at: base() + Duration::hours(i64::from(id)),
            updated_at: base(),
        }
    }

    fn fixture() -> Vec<LotteryActivity> {
        vec![
            activity(1, "Spring Spin", LotteryStatus::Ended, 400),
            activity(2, "Autumn Draw", LotteryStatus::Active, 120),
            activity(3, "Black Friday Wheel", LotteryStatus::Draft, 0),
        ]
    }

    #[test]
    fn test_status_filter_and_default_order() {
        let page = activity_table(fixture(), &ActivityQuery::default());
        let ids: Vec<i32> = page.items.iter().map(|a| a.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let query = ActivityQuery {
            status: Some(LotteryStatus::Active),
            ..ActivityQuery::default()
        };
        let page = activity_table(fixture(), &query);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Autumn Draw");
    }

    #[test]
    fn test_search_and_sort_by_draws() {
        let query = ActivityQuery {
            q: Some("DRAW".to_string()),
            ..ActivityQuery::default()
        };
        assert_eq!(activity_table(fixture(), &query).total, 1);

        let query = ActivityQuery {
            sort: Some("draws".to_string()),
            dir: Some("asc".to_string()),
            ..ActivityQuery::default()
        };
        let page = activity_table(fixture(), &query);
        assert_eq!(page.items[0].name, "Black Friday Wheel");
    }
}
