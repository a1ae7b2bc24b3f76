//! Lottery repository.

use chrono::Utc;
use rand::Rng;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use mistore_core::lottery::{PrizeOdds, draw, validate_odds};
use mistore_core::{
    LotteryActivityId, LotteryDrawId, LotteryPrizeId, LotteryStatus, PrizeType, UserId,
};

use crate::RepositoryError;
use crate::models::{
    DrawOutcome, LotteryActivity, LotteryActivityInput, LotteryDraw, LotteryPrize,
    LotteryPrizeInput, non_blank_ref,
};

const ACTIVITY_SELECT: &str = "
    SELECT a.id, a.name, a.description, a.status, a.starts_at, a.ends_at,
           a.max_draws_per_user,
           (SELECT COUNT(*) FROM shop.lottery_prize p WHERE p.activity_id = a.id) AS prize_count,
           (SELECT COUNT(*) FROM shop.lottery_draw d WHERE d.activity_id = a.id) AS draw_count,
           a.created_at, a.updated_at
    FROM shop.lottery_activity a";

const PRIZE_COLUMNS: &str = "id, activity_id, name, prize_type, probability_bp, stock_limit, \
                             stock_remaining, coupon_id, product_id, points, sort_order, created_at";

const DRAW_SELECT: &str = "
    SELECT d.id, d.activity_id, d.user_id, d.prize_id,
           p.name AS prize_name, p.prize_type, d.created_at
    FROM shop.lottery_draw d
    LEFT JOIN shop.lottery_prize p ON p.id = d.prize_id";

/// Repository for lottery activities, prizes and draws.
pub struct LotteryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LotteryRepository<'a> {
    /// Create a new lottery repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Activities
    // =========================================================================

    /// Every activity, newest first. The admin table filters in memory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_activities(&self) -> Result<Vec<LotteryActivity>, RepositoryError> {
        let rows = sqlx::query_as::<_, LotteryActivity>(&format!(
            "{ACTIVITY_SELECT} ORDER BY a.created_at DESC, a.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Activities shoppers can draw in right now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_running(&self) -> Result<Vec<LotteryActivity>, RepositoryError> {
        let rows = sqlx::query_as::<_, LotteryActivity>(&format!(
            "{ACTIVITY_SELECT}
             WHERE a.status = 'active' AND a.starts_at <= NOW() AND a.ends_at > NOW()
             ORDER BY a.ends_at"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_activity(
        &self,
        id: LotteryActivityId,
    ) -> Result<Option<LotteryActivity>, RepositoryError> {
        let row = sqlx::query_as::<_, LotteryActivity>(&format!("{ACTIVITY_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Create a draft activity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_activity(
        &self,
        input: &LotteryActivityInput,
    ) -> Result<LotteryActivity, RepositoryError> {
        let id: LotteryActivityId = sqlx::query_scalar(
            "INSERT INTO shop.lottery_activity
                (name, description, starts_at, ends_at, max_draws_per_user)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(input.name.trim())
        .bind(non_blank_ref(input.description.as_deref()))
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.max_draws_per_user)
        .fetch_one(self.pool)
        .await?;

        self.get_activity(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the activity does not exist.
    #[instrument(skip(self, input))]
    pub async fn update_activity(
        &self,
        id: LotteryActivityId,
        input: &LotteryActivityInput,
    ) -> Result<LotteryActivity, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.lottery_activity
             SET name = $2, description = $3, starts_at = $4, ends_at = $5,
                 max_draws_per_user = $6
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(non_blank_ref(input.description.as_deref()))
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.max_draws_per_user)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_activity(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete an activity with its prizes and draw history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the activity does not exist.
    #[instrument(skip(self))]
    pub async fn delete_activity(&self, id: LotteryActivityId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.lottery_activity WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Change an activity's status. Activating requires at least one prize
    /// and an end date in the future.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the activity does not exist.
    /// Returns `RepositoryError::Rejected` if it cannot be activated.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: LotteryActivityId,
        status: LotteryStatus,
    ) -> Result<LotteryActivity, RepositoryError> {
        let activity = self.get_activity(id).await?.ok_or(RepositoryError::NotFound)?;

        if status == LotteryStatus::Active {
            if activity.prize_count == 0 {
                return Err(RepositoryError::Rejected(
                    "add at least one prize before activating".to_owned(),
                ));
            }
            if activity.ends_at <= Utc::now() {
                return Err(RepositoryError::Rejected("activity has already ended".to_owned()));
            }
        }

        sqlx::query("UPDATE shop.lottery_activity SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;

        self.get_activity(id).await?.ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Prizes
    // =========================================================================

    /// An activity's prizes in draw order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_prizes(
        &self,
        activity_id: LotteryActivityId,
    ) -> Result<Vec<LotteryPrize>, RepositoryError> {
        let rows = sqlx::query_as::<_, LotteryPrize>(&format!(
            "SELECT {PRIZE_COLUMNS} FROM shop.lottery_prize
             WHERE activity_id = $1 ORDER BY sort_order, id"
        ))
        .bind(activity_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Add a prize, checking the activity's odds still fit in 100%.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the activity does not exist.
    /// Returns `RepositoryError::Odds` if the odds would exceed 10 000 bp.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_prize(
        &self,
        activity_id: LotteryActivityId,
        input: &LotteryPrizeInput,
    ) -> Result<LotteryPrize, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut odds = lock_sibling_odds(&mut tx, activity_id, None).await?;
        odds.push(PrizeOdds {
            prize_id: LotteryPrizeId::new(0),
            probability_bp: input.probability_bp,
            stock_remaining: input.stock_limit,
        });
        validate_odds(&odds)?;

        let prize = sqlx::query_as::<_, LotteryPrize>(&format!(
            "INSERT INTO shop.lottery_prize
                (activity_id, name, prize_type, probability_bp, stock_limit, stock_remaining,
                 coupon_id, product_id, points, sort_order)
             VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8, $9)
             RETURNING {PRIZE_COLUMNS}"
        ))
        .bind(activity_id)
        .bind(input.name.trim())
        .bind(input.prize_type)
        .bind(input.probability_bp)
        .bind(input.stock_limit)
        .bind(input.coupon_id)
        .bind(input.product_id)
        .bind(input.points)
        .bind(input.sort_order)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::on_write(e, "prize refers to an unknown coupon or product"))?;

        tx.commit().await?;
        Ok(prize)
    }

    /// Update a prize. Remaining stock is recomputed from the new limit and
    /// the number already won.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the prize does not belong to the
    /// activity. Returns `RepositoryError::Odds` if the odds would exceed
    /// 10 000 bp.
    #[instrument(skip(self, input))]
    pub async fn update_prize(
        &self,
        activity_id: LotteryActivityId,
        prize_id: LotteryPrizeId,
        input: &LotteryPrizeInput,
    ) -> Result<LotteryPrize, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut odds = lock_sibling_odds(&mut tx, activity_id, Some(prize_id)).await?;
        odds.push(PrizeOdds {
            prize_id,
            probability_bp: input.probability_bp,
            stock_remaining: input.stock_limit,
        });
        validate_odds(&odds)?;

        let awarded: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.lottery_draw WHERE prize_id = $1")
                .bind(prize_id)
                .fetch_one(&mut *tx)
                .await?;
        let stock_remaining = input
            .stock_limit
            .map(|limit| remaining_after(limit, awarded));

        let prize = sqlx::query_as::<_, LotteryPrize>(&format!(
            "UPDATE shop.lottery_prize
             SET name = $3, prize_type = $4, probability_bp = $5, stock_limit = $6,
                 stock_remaining = $7, coupon_id = $8, product_id = $9, points = $10,
                 sort_order = $11
             WHERE id = $1 AND activity_id = $2
             RETURNING {PRIZE_COLUMNS}"
        ))
        .bind(prize_id)
        .bind(activity_id)
        .bind(input.name.trim())
        .bind(input.prize_type)
        .bind(input.probability_bp)
        .bind(input.stock_limit)
        .bind(stock_remaining)
        .bind(input.coupon_id)
        .bind(input.product_id)
        .bind(input.points)
        .bind(input.sort_order)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::on_write(e, "prize refers to an unknown coupon or product"))?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(prize)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the prize does not belong to the
    /// activity.
    #[instrument(skip(self))]
    pub async fn delete_prize(
        &self,
        activity_id: LotteryActivityId,
        prize_id: LotteryPrizeId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.lottery_prize WHERE id = $1 AND activity_id = $2")
                .bind(prize_id)
                .bind(activity_id)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Draws
    // =========================================================================

    /// Draw once for `user_id`.
    ///
    /// Runs in a transaction holding a per-(activity, user) advisory lock, so
    /// the per-user limit holds under concurrent requests. Prize rows are
    /// locked before selection; an out-of-stock prize is never picked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the activity does not exist.
    /// Returns `RepositoryError::Rejected` if it is not running or the user
    /// has no draws left.
    #[instrument(skip(self, rng))]
    pub async fn draw<R: Rng + Send + ?Sized>(
        &self,
        activity_id: LotteryActivityId,
        user_id: UserId,
        rng: &mut R,
    ) -> Result<DrawOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(activity_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let activity = sqlx::query_as::<_, LotteryActivity>(&format!(
            "{ACTIVITY_SELECT} WHERE a.id = $1"
        ))
        .bind(activity_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if !activity.is_running(Utc::now()) {
            return Err(RepositoryError::Rejected("this lottery is not running".to_owned()));
        }

        let used: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.lottery_draw WHERE activity_id = $1 AND user_id = $2",
        )
        .bind(activity_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        let remaining = i64::from(activity.max_draws_per_user) - used;
        if remaining <= 0 {
            return Err(RepositoryError::Rejected("no draws remaining".to_owned()));
        }

        let prizes = sqlx::query_as::<_, LotteryPrize>(&format!(
            "SELECT {PRIZE_COLUMNS} FROM shop.lottery_prize
             WHERE activity_id = $1 ORDER BY sort_order, id
             FOR UPDATE"
        ))
        .bind(activity_id)
        .fetch_all(&mut *tx)
        .await?;

        let odds: Vec<PrizeOdds> = prizes.iter().map(LotteryPrize::odds).collect();
        let won_id = draw(&odds, rng);
        let mut prize = won_id.and_then(|id| prizes.into_iter().find(|p| p.id == id));

        if let Some(p) = prize.as_mut()
            && let Some(stock) = p.stock_remaining
        {
            sqlx::query(
                "UPDATE shop.lottery_prize SET stock_remaining = stock_remaining - 1
                 WHERE id = $1 AND stock_remaining > 0",
            )
            .bind(p.id)
            .execute(&mut *tx)
            .await?;
            p.stock_remaining = Some(stock - 1);
        }

        let draw_id: LotteryDrawId = sqlx::query_scalar(
            "INSERT INTO shop.lottery_draw (activity_id, user_id, prize_id)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(activity_id)
        .bind(user_id)
        .bind(prize.as_ref().map(|p| p.id))
        .fetch_one(&mut *tx)
        .await?;

        let record = sqlx::query_as::<_, LotteryDraw>(&format!("{DRAW_SELECT} WHERE d.id = $1"))
            .bind(draw_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let won = prize
            .as_ref()
            .is_some_and(|p| p.prize_type != PrizeType::Nothing);
        tracing::info!(
            activity_id = %activity_id,
            user_id = %user_id,
            prize_id = ?prize.as_ref().map(|p| p.id),
            won,
            "Lottery draw"
        );

        Ok(DrawOutcome {
            draw: record,
            prize,
            won,
            draws_remaining: i32::try_from(remaining - 1).unwrap_or(0),
        })
    }

    /// A user's draws in one activity, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn draws_for_user(
        &self,
        activity_id: LotteryActivityId,
        user_id: UserId,
    ) -> Result<Vec<LotteryDraw>, RepositoryError> {
        let rows = sqlx::query_as::<_, LotteryDraw>(&format!(
            "{DRAW_SELECT} WHERE d.activity_id = $1 AND d.user_id = $2
             ORDER BY d.created_at DESC, d.id DESC"
        ))
        .bind(activity_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Latest draws in an activity, for the admin view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn draws_for_activity(
        &self,
        activity_id: LotteryActivityId,
        limit: i64,
    ) -> Result<Vec<LotteryDraw>, RepositoryError> {
        let rows = sqlx::query_as::<_, LotteryDraw>(&format!(
            "{DRAW_SELECT} WHERE d.activity_id = $1
             ORDER BY d.created_at DESC, d.id DESC
             LIMIT $2"
        ))
        .bind(activity_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// Lock the activity row and return the odds of its prizes, leaving out
/// `except` (the prize being edited).
async fn lock_sibling_odds(
    tx: &mut Transaction<'_, Postgres>,
    activity_id: LotteryActivityId,
    except: Option<LotteryPrizeId>,
) -> Result<Vec<PrizeOdds>, RepositoryError> {
    let exists: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM shop.lottery_activity WHERE id = $1 FOR UPDATE")
            .bind(activity_id)
            .fetch_optional(&mut **tx)
            .await?;
    if exists.is_none() {
        return Err(RepositoryError::NotFound);
    }

    let rows: Vec<(LotteryPrizeId, i32, Option<i32>)> = sqlx::query_as(
        "SELECT id, probability_bp, stock_remaining FROM shop.lottery_prize
         WHERE activity_id = $1 AND ($2::INTEGER IS NULL OR id <> $2)",
    )
    .bind(activity_id)
    .bind(except)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(prize_id, probability_bp, stock_remaining)| PrizeOdds {
            prize_id,
            probability_bp,
            stock_remaining,
        })
        .collect())
}

/// Stock left for a prize whose limit is `limit` after `awarded` wins.
fn remaining_after(limit: i32, awarded: i64) -> i32 {
    let left = i64::from(limit) - awarded;
    i32::try_from(left.max(0)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_after() {
        assert_eq!(remaining_after(10, 3), 7);
        assert_eq!(remaining_after(2, 5), 0);
        assert_eq!(remaining_after(0, 0), 0);
    }
}
