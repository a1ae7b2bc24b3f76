//! Lottery route handlers.

use axum::extract::State;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::instrument;

use mistore_core::{LotteryActivityId, LotteryPrizeId, LotteryStatus, PrizeType};
use mistore_db::LotteryRepository;
use mistore_db::models::{DrawOutcome, LotteryActivity, LotteryDraw, LotteryPrize};

use crate::error::{ApiPath, ApiResult, AppError, ok};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

/// What a shopper may know about a prize. Odds and stock stay private.
#[derive(Debug, Clone, Serialize)]
pub struct PrizeSummary {
    pub id: LotteryPrizeId,
    pub name: String,
    pub prize_type: PrizeType,
}

impl From<LotteryPrize> for PrizeSummary {
    fn from(prize: LotteryPrize) -> Self {
        Self {
            id: prize.id,
            name: prize.name,
            prize_type: prize.prize_type,
        }
    }
}

/// A running activity as shown on the lottery page.
#[derive(Debug, Clone, Serialize)]
pub struct LotteryView {
    #[serde(flatten)]
    pub activity: LotteryActivity,
    pub prizes: Vec<PrizeSummary>,
    /// Only present for logged-in shoppers.
    pub draws_remaining: Option<i32>,
}

/// Activities open for drawing right now.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> ApiResult<Vec<LotteryView>> {
    let repo = LotteryRepository::new(state.pool());
    let activities = repo.list_running().await?;

    let mut views = Vec::with_capacity(activities.len());
    for activity in activities {
        let prizes = repo
            .list_prizes(activity.id)
            .await?
            .into_iter()
            .filter(|p| p.prize_type != PrizeType::Nothing)
            .map(PrizeSummary::from)
            .collect();

        let draws_remaining = match &user {
            Some(user) => {
                let used = repo.draws_for_user(activity.id, user.id).await?.len();
                Some(remaining_draws(activity.max_draws_per_user, used))
            }
            None => None,
        };

        views.push(LotteryView {
            activity,
            prizes,
            draws_remaining,
        });
    }
    ok(views)
}

/// Draw once.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn draw(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<LotteryActivityId>,
) -> ApiResult<DrawOutcome> {
    let mut rng = StdRng::from_os_rng();
    let outcome = LotteryRepository::new(state.pool())
        .draw(id, user.id, &mut rng)
        .await?;
    ok(outcome)
}

/// The caller's draws in one activity, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn draws(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<LotteryActivityId>,
) -> ApiResult<Vec<LotteryDraw>> {
    let repo = LotteryRepository::new(state.pool());
    let activity = repo
        .get_activity(id)
        .await?
        .filter(|a| a.status != LotteryStatus::Draft)
        .ok_or_else(|| AppError::NotFound("Lottery not found".to_string()))?;

    ok(repo.draws_for_user(activity.id, user.id).await?)
}

fn remaining_draws(max_per_user: i32, used: usize) -> i32 {
    let used = i32::try_from(used).unwrap_or(i32::MAX);
    (max_per_user - used).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_draws() {
        assert_eq!(remaining_draws(3, 0), 3);
        assert_eq!(remaining_draws(3, 2), 1);
        assert_eq!(remaining_draws(3, 5), 0);
    }
}
