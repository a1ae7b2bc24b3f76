//! Status enums for store entities.
//!
//! Each enum maps to a `PostgreSQL` enum in the `shop` schema (with the
//! `postgres` feature) and to a string on the wire. Order statuses travel as
//! `SCREAMING_SNAKE_CASE` (`"PENDING"`), matching what the console filters on;
//! everything else is `snake_case`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an unknown enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, `ALL`, `Display` and `FromStr` for a fieldless enum.
///
/// `FromStr` is case-insensitive so query parameters like `?status=paid` and
/// `?status=PAID` both work.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical string form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| ParseStatusError {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }
    };
}

// =============================================================================
// Orders
// =============================================================================

/// Order lifecycle status.
///
/// ```text
/// PENDING ──pay──▶ PAID ──ship──▶ SHIPPED ──deliver──▶ DELIVERED
///    │               │  ╲                                  │
///    └──▶ CANCELLED ◀┘   ╲──────────▶ REFUNDED ◀───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

string_enum!(OrderStatus, "order status", {
    Pending => "PENDING",
    Paid => "PAID",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
});

/// Rejected order status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move order from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Statuses reachable in one step from `self`.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Paid, Self::Cancelled],
            Self::Paid => &[Self::Shipped, Self::Cancelled, Self::Refunded],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered => &[Self::Refunded],
            Self::Cancelled | Self::Refunded => &[],
        }
    }

    /// Whether `next` is reachable in one step.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Validate a status change.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if `next` is not an allowed successor.
    pub fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// No further transitions possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Whether the order's total is counted as revenue in analytics.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        matches!(self, Self::Paid | Self::Shipped | Self::Delivered)
    }

    /// Whether moving from `self` to `next` returns reserved stock and
    /// coupon usage. Goods that have shipped are not restocked on refund.
    #[must_use]
    pub const fn releases_stock_on(self, next: Self) -> bool {
        matches!(
            (self, next),
            (_, Self::Cancelled) | (Self::Paid, Self::Refunded)
        )
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Product visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.product_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Listed and purchasable.
    Active,
    /// Being edited, hidden from the storefront.
    #[default]
    Draft,
    /// Retired, hidden from the storefront but kept for order history.
    Archived,
}

string_enum!(ProductStatus, "product status", {
    Active => "active",
    Draft => "draft",
    Archived => "archived",
});

/// Kind of block rendered on the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.home_section_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum HomeSectionKind {
    Banner,
    ProductGrid,
    CategoryShowcase,
    Promo,
}

string_enum!(HomeSectionKind, "home section kind", {
    Banner => "banner",
    ProductGrid => "product_grid",
    CategoryShowcase => "category_showcase",
    Promo => "promo",
});

// =============================================================================
// Users
// =============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Storefront shopper.
    #[default]
    Customer,
    /// Access to the admin console.
    Admin,
}

string_enum!(UserRole, "user role", {
    Customer => "customer",
    Admin => "admin",
});

// =============================================================================
// Promotions
// =============================================================================

/// How a coupon's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.coupon_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    /// `value` is a percentage of the subtotal (0-100).
    Percentage,
    /// `value` is an amount in pounds.
    FixedAmount,
    /// Waives the shipping fee; `value` is ignored.
    FreeShipping,
}

string_enum!(CouponType, "coupon type", {
    Percentage => "percentage",
    FixedAmount => "fixed_amount",
    FreeShipping => "free_shipping",
});

/// Lottery activity lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.lottery_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LotteryStatus {
    #[default]
    Draft,
    Active,
    Ended,
}

string_enum!(LotteryStatus, "lottery status", {
    Draft => "draft",
    Active => "active",
    Ended => "ended",
});

/// What a lottery prize awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.prize_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PrizeType {
    /// Reveals a coupon code.
    Coupon,
    /// A physical product shipped separately.
    Product,
    /// Loyalty points.
    Points,
    /// "Better luck next time" slot.
    Nothing,
}

string_enum!(PrizeType, "prize type", {
    Coupon => "coupon",
    Product => "product",
    Points => "points",
    Nothing => "nothing",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let status = OrderStatus::Pending
            .transition(OrderStatus::Paid)
            .and_then(|s| s.transition(OrderStatus::Shipped))
            .and_then(|s| s.transition(OrderStatus::Delivered))
            .unwrap();
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Paid));

        let err = OrderStatus::Cancelled
            .transition(OrderStatus::Paid)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot move order from CANCELLED to PAID");
    }

    #[test]
    fn test_every_transition_is_checked() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let allowed = from.allowed_transitions().contains(to);
                assert_eq!(from.transition(*to).is_ok(), allowed, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn test_stock_returns_only_for_unshipped_goods() {
        assert!(OrderStatus::Pending.releases_stock_on(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.releases_stock_on(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.releases_stock_on(OrderStatus::Refunded));
        assert!(!OrderStatus::Delivered.releases_stock_on(OrderStatus::Refunded));
        assert!(!OrderStatus::Pending.releases_stock_on(OrderStatus::Paid));
        assert!(!OrderStatus::Paid.releases_stock_on(OrderStatus::Shipped));
    }

    #[test]
    fn test_revenue_statuses() {
        let revenue: Vec<_> = OrderStatus::ALL
            .iter()
            .filter(|s| s.counts_as_revenue())
            .collect();
        assert_eq!(
            revenue,
            vec![&OrderStatus::Paid, &OrderStatus::Shipped, &OrderStatus::Delivered]
        );
    }

    #[test]
    fn test_order_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"SHIPPED\"").unwrap();
        assert_eq!(parsed, OrderStatus::Shipped);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("paid".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert_eq!(
            "FIXED_AMOUNT".parse::<CouponType>().unwrap(),
            CouponType::FixedAmount
        );
        assert_eq!("Admin".parse::<UserRole>().unwrap(), UserRole::Admin);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "lost".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: lost");
    }

    #[test]
    fn test_snake_case_wire_format() {
        assert_eq!(
            serde_json::to_string(&HomeSectionKind::ProductGrid).unwrap(),
            "\"product_grid\""
        );
        assert_eq!(
            serde_json::to_string(&CouponType::FreeShipping).unwrap(),
            "\"free_shipping\""
        );
    }
}
