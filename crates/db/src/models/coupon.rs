//! Coupons.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mistore_core::coupon::{CouponRules, CouponState};
use mistore_core::validation::{COUPON_CODE_PATTERN, FieldErrors, Validator};
use mistore_core::{CouponId, CouponType};

/// A discount code.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub description: Option<String>,
    pub coupon_type: CouponType,
    pub value: Decimal,
    pub min_order_amount: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    #[must_use]
    pub fn rules(&self) -> CouponRules {
        CouponRules {
            coupon_type: self.coupon_type,
            value: self.value,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            is_active: self.is_active,
        }
    }

    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> CouponState {
        self.rules().state(now)
    }
}

/// Coupon create/update form.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponInput {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub coupon_type: CouponType,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default)]
    pub min_order_amount: Decimal,
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub usage_limit: Option<i32>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl CouponInput {
    /// Codes are stored upper-case.
    #[must_use]
    pub fn normalized_code(&self) -> String {
        self.code.trim().to_uppercase()
    }

    /// Validate the form. `used_count` is the current redemption count when
    /// editing, so a limit cannot be lowered below it.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self, used_count: i32) -> Result<(), FieldErrors> {
        let code = self.normalized_code();
        let mut v = Validator::new();
        v.required("code", &code).pattern(
            "code",
            &code,
            &COUPON_CODE_PATTERN,
            "must be 3-32 letters or digits",
        );
        self.rules(used_count).validate_into(&mut v);
        v.finish()
    }

    #[must_use]
    pub const fn rules(&self, used_count: i32) -> CouponRules {
        CouponRules {
            coupon_type: self.coupon_type,
            value: self.value,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            usage_limit: self.usage_limit,
            used_count,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            is_active: self.is_active,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> CouponInput {
        CouponInput {
            code: " welcome10 ".to_owned(),
            description: None,
            coupon_type: CouponType::Percentage,
            value: Decimal::from(10),
            min_order_amount: Decimal::ZERO,
            max_discount: None,
            usage_limit: Some(100),
            starts_at: None,
            ends_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_code_is_normalised_before_validation() {
        assert_eq!(input().normalized_code(), "WELCOME10");
        assert!(input().validate(0).is_ok());
    }

    #[test]
    fn test_bad_code() {
        let bad = CouponInput {
            code: "no spaces!".to_owned(),
            ..input()
        };
        assert!(bad.validate(0).unwrap_err().get("code").is_some());
    }

    #[test]
    fn test_limit_cannot_drop_below_usage() {
        let errors = input().validate(150).unwrap_err();
        assert!(errors.get("usage_limit").is_some());
    }

    #[test]
    fn test_deserialize_defaults_active() {
        let input: CouponInput =
            serde_json::from_str(r#"{"code":"SHIPFREE","coupon_type":"free_shipping"}"#).unwrap();
        assert!(input.is_active);
        assert!(input.validate(0).is_ok());
    }
}
