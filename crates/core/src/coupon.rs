//! Coupon eligibility and discount rules.
//!
//! The database row carries the same fields as [`CouponRules`]; repositories
//! convert rows into rules, ask [`CouponRules::check_eligibility`] and only
//! then redeem with a conditional `used_count` increment, so the
//! `used_count <= usage_limit` invariant holds even under concurrent checkouts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CouponType, round_money};
use crate::validation::Validator;

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("coupon not found")]
    NotFound,
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotStarted,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("order subtotal must be at least £{required}")]
    MinimumNotMet { required: Decimal },
}

/// Display state used by the admin coupon table filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponState {
    Active,
    Inactive,
    Scheduled,
    Expired,
    Exhausted,
}

/// The rule-bearing fields of a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRules {
    pub coupon_type: CouponType,
    pub value: Decimal,
    pub min_order_amount: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl CouponRules {
    /// Uses left before the limit, `None` when unlimited.
    #[must_use]
    pub fn remaining_uses(&self) -> Option<i32> {
        self.usage_limit
            .map(|limit| (limit - self.used_count).max(0))
    }

    /// Classify the coupon for display and filtering at `now`.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> CouponState {
        if self.ends_at.is_some_and(|end| now > end) {
            CouponState::Expired
        } else if self.remaining_uses() == Some(0) {
            CouponState::Exhausted
        } else if !self.is_active {
            CouponState::Inactive
        } else if self.starts_at.is_some_and(|start| now < start) {
            CouponState::Scheduled
        } else {
            CouponState::Active
        }
    }

    /// Check whether the coupon may be applied to `subtotal` at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule, checked in the order a shopper would
    /// want to hear about it.
    pub fn check_eligibility(&self, now: DateTime<Utc>, subtotal: Decimal) -> Result<(), CouponError> {
        if !self.is_active {
            return Err(CouponError::Inactive);
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Err(CouponError::NotStarted);
        }
        if self.ends_at.is_some_and(|end| now > end) {
            return Err(CouponError::Expired);
        }
        if self.remaining_uses() == Some(0) {
            return Err(CouponError::UsageLimitReached);
        }
        if subtotal < self.min_order_amount {
            return Err(CouponError::MinimumNotMet {
                required: self.min_order_amount,
            });
        }
        Ok(())
    }

    /// Discount granted on an order.
    ///
    /// Never exceeds the subtotal (or the shipping fee for free-shipping
    /// coupons) and honours `max_discount`.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal, shipping_fee: Decimal) -> Decimal {
        let raw = match self.coupon_type {
            CouponType::Percentage => subtotal * self.value / Decimal::ONE_HUNDRED,
            CouponType::FixedAmount => self.value,
            CouponType::FreeShipping => return round_money(shipping_fee.max(Decimal::ZERO)),
        };

        let capped = self
            .max_discount
            .map_or(raw, |cap| raw.min(cap))
            .min(subtotal)
            .max(Decimal::ZERO);

        round_money(capped)
    }

    /// Validate the rules as submitted on the admin coupon form.
    pub fn validate_into(&self, v: &mut Validator) {
        match self.coupon_type {
            CouponType::Percentage => {
                v.range(
                    "value",
                    self.value,
                    Some(Decimal::new(1, 2)),
                    Some(Decimal::ONE_HUNDRED),
                );
            }
            CouponType::FixedAmount => {
                v.range("value", self.value, Some(Decimal::new(1, 2)), None);
            }
            CouponType::FreeShipping => {}
        }
        v.range("min_order_amount", self.min_order_amount, Some(Decimal::ZERO), None);
        if let Some(cap) = self.max_discount {
            v.range("max_discount", cap, Some(Decimal::new(1, 2)), None);
        }
        if let Some(limit) = self.usage_limit {
            v.range("usage_limit", limit, Some(self.used_count.max(1)), None);
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            v.check("ends_at", end > start, "must be after starts_at");
        }
    }
}
