//! Shipping and order total calculation.
//!
//! Totals are computed once at checkout and stored on the order; nothing
//! downstream recomputes them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::coupon::CouponRules;
use crate::types::round_money;

/// Shipping fee and free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Flat UK shipping fee.
    pub shipping_fee: Decimal,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            shipping_fee: Decimal::new(499, 2),
            free_shipping_threshold: Decimal::new(5000, 2),
        }
    }
}

impl PricingPolicy {
    /// Shipping fee for a cart subtotal. Empty carts ship for free.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.shipping_fee
        }
    }
}

/// One priced line of a cart or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl LineAmount {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Money breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Price a set of lines, optionally applying a coupon that has already
    /// passed its eligibility check.
    #[must_use]
    pub fn compute(lines: &[LineAmount], coupon: Option<&CouponRules>, policy: &PricingPolicy) -> Self {
        let subtotal = round_money(lines.iter().map(LineAmount::total).sum());
        let shipping_fee = policy.shipping_for(subtotal);
        let discount = coupon.map_or(Decimal::ZERO, |c| c.discount_for(subtotal, shipping_fee));
        let total = (subtotal + shipping_fee - discount).max(Decimal::ZERO);

        Self {
            subtotal,
            discount,
            shipping_fee,
            total: round_money(total),
        }
    }
}

/// Human-facing order number, e.g. `MI20261016000042`.
///
/// `seq` is the order's database ID, so numbers are unique without a separate
/// sequence.
#[must_use]
pub fn order_number(placed_at: DateTime<Utc>, seq: i32) -> String {
    format!("MI{}{:06}", placed_at.format("%Y%m%d"), seq)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::CouponType;

    fn lines() -> Vec<LineAmount> {
        vec![
            LineAmount {
                unit_price: Decimal::new(1999, 2),
                quantity: 2,
            },
            LineAmount {
                unit_price: Decimal::new(500, 2),
                quantity: 1,
            },
        ]
    }

    fn coupon(coupon_type: CouponType, value: Decimal) -> CouponRules {
        CouponRules {
            coupon_type,
            value,
            min_order_amount: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_shipping_threshold() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.shipping_for(Decimal::new(4999, 2)), Decimal::new(499, 2));
        assert_eq!(policy.shipping_for(Decimal::new(5000, 2)), Decimal::ZERO);
        assert_eq!(policy.shipping_for(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_totals_without_coupon() {
        let totals = OrderTotals::compute(&lines(), None, &PricingPolicy::default());
        assert_eq!(totals.subtotal, Decimal::new(4498, 2));
        assert_eq!(totals.shipping_fee, Decimal::new(499, 2));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(4997, 2));
    }

    #[test]
    fn test_totals_with_percentage_coupon() {
        let c = coupon(CouponType::Percentage, Decimal::from(10));
        let totals = OrderTotals::compute(&lines(), Some(&c), &PricingPolicy::default());
        assert_eq!(totals.discount, Decimal::new(450, 2));
        assert_eq!(totals.total, Decimal::new(4547, 2));
    }

    #[test]
    fn test_totals_with_free_shipping_coupon() {
        let c = coupon(CouponType::FreeShipping, Decimal::ZERO);
        let totals = OrderTotals::compute(&lines(), Some(&c), &PricingPolicy::default());
        assert_eq!(totals.discount, totals.shipping_fee);
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn test_total_never_negative() {
        let c = coupon(CouponType::FixedAmount, Decimal::from(500));
        let totals = OrderTotals::compute(&lines(), Some(&c), &PricingPolicy::default());
        assert!(totals.total >= Decimal::ZERO);
    }

    #[test]
    fn test_order_number_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        assert_eq!(order_number(at, 42), "MI20261016000042");
    }
}
