//! Lottery activities, prizes and draws.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mistore_core::lottery::PrizeOdds;
use mistore_core::validation::{FieldErrors, Validator};
use mistore_core::{
    CouponId, LotteryActivityId, LotteryDrawId, LotteryPrizeId, LotteryStatus, PrizeType,
    ProductId, UserId,
};

/// A lottery campaign.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LotteryActivity {
    pub id: LotteryActivityId,
    pub name: String,
    pub description: Option<String>,
    pub status: LotteryStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_draws_per_user: i32,
    pub prize_count: i64,
    pub draw_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LotteryActivity {
    /// Whether shoppers can draw at `now`.
    #[must_use]
    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        self.status == LotteryStatus::Active && self.starts_at <= now && now < self.ends_at
    }
}

/// Lottery activity create/update form.
#[derive(Debug, Clone, Deserialize)]
pub struct LotteryActivityInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default = "default_max_draws")]
    pub max_draws_per_user: i32,
}

const fn default_max_draws() -> i32 {
    1
}

impl LotteryActivityInput {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .required("name", &self.name)
            .max_len("name", &self.name, 120)
            .check("ends_at", self.ends_at > self.starts_at, "must be after starts_at")
            .range("max_draws_per_user", self.max_draws_per_user, Some(1), Some(100))
            .finish()
    }
}

/// A prize that can be won in an activity.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LotteryPrize {
    pub id: LotteryPrizeId,
    pub activity_id: LotteryActivityId,
    pub name: String,
    pub prize_type: PrizeType,
    /// Chance of winning, in basis points.
    pub probability_bp: i32,
    /// `None` means unlimited.
    pub stock_limit: Option<i32>,
    pub stock_remaining: Option<i32>,
    pub coupon_id: Option<CouponId>,
    pub product_id: Option<ProductId>,
    pub points: Option<i32>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl LotteryPrize {
    #[must_use]
    pub const fn odds(&self) -> PrizeOdds {
        PrizeOdds {
            prize_id: self.id,
            probability_bp: self.probability_bp,
            stock_remaining: self.stock_remaining,
        }
    }
}

/// Prize create/update form.
#[derive(Debug, Clone, Deserialize)]
pub struct LotteryPrizeInput {
    pub name: String,
    pub prize_type: PrizeType,
    pub probability_bp: i32,
    #[serde(default)]
    pub stock_limit: Option<i32>,
    #[serde(default)]
    pub coupon_id: Option<CouponId>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub points: Option<i32>,
    #[serde(default)]
    pub sort_order: i32,
}

impl LotteryPrizeInput {
    /// Validate the form. Sibling odds are checked by the repository.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut v = Validator::new();
        v.required("name", &self.name)
            .max_len("name", &self.name, 120)
            .range("probability_bp", self.probability_bp, Some(0), Some(10_000));
        if let Some(limit) = self.stock_limit {
            v.range("stock_limit", limit, Some(0), None);
        }
        match self.prize_type {
            PrizeType::Coupon => {
                v.check("coupon_id", self.coupon_id.is_some(), "is required for coupon prizes");
            }
            PrizeType::Product => {
                v.check("product_id", self.product_id.is_some(), "is required for product prizes");
            }
            PrizeType::Points => {
                v.check(
                    "points",
                    self.points.is_some_and(|p| p > 0),
                    "must be a positive number of points",
                );
            }
            PrizeType::Nothing => {}
        }
        v.finish()
    }
}

/// One recorded draw.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LotteryDraw {
    pub id: LotteryDrawId,
    pub activity_id: LotteryActivityId,
    pub user_id: UserId,
    pub prize_id: Option<LotteryPrizeId>,
    pub prize_name: Option<String>,
    pub prize_type: Option<PrizeType>,
    pub created_at: DateTime<Utc>,
}

/// Result of a draw as shown to the shopper.
#[derive(Debug, Clone, Serialize)]
pub struct DrawOutcome {
    pub draw: LotteryDraw,
    pub prize: Option<LotteryPrize>,
    /// Whether the shopper won something other than "nothing".
    pub won: bool,
    pub draws_remaining: i32,
}
