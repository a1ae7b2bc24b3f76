//! Records read from and written to the store database.
//!
//! Output types derive `Serialize` and go straight into API responses. Input
//! types (`*Input`) derive `Deserialize`, come straight from request bodies
//! and carry a `validate()` that reports every bad field at once.

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod home;
pub mod lottery;
pub mod order;
pub mod sync;
pub mod user;

pub use analytics::{
    AnalyticsSummary, DailyRevenue, LowStockProduct, StatusCount, TopProduct, fill_daily_series,
};
pub use cart::CartLine;
pub use catalog::{
    Category, CategoryInput, Product, ProductFilter, ProductInput, ProductOrder, ProductSort,
};
pub use coupon::{Coupon, CouponInput};
pub use home::{HomeSection, HomeSectionInput};
pub use lottery::{
    DrawOutcome, LotteryActivity, LotteryActivityInput, LotteryDraw, LotteryPrize,
    LotteryPrizeInput,
};
pub use order::{
    CustomerRef, Order, OrderDetail, OrderFilter, OrderItem, OrderOrder, OrderSort, OrderSummary,
    ShippingAddress,
};
pub use sync::ChangeCursor;
pub use user::{Address, AddressInput, User, UserFilter, UserSummary};

/// Trim an optional string, mapping blank to `None`.
pub(crate) fn non_blank_ref(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_ref() {
        assert_eq!(non_blank_ref(None), None);
        assert_eq!(non_blank_ref(Some("   ")), None);
        assert_eq!(non_blank_ref(Some(" Flat 2 ")), Some("Flat 2"));
    }
}
