//! Orders and order items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use mistore_core::listing::SortDirection;
use mistore_core::{CouponId, Email, OrderId, OrderItemId, OrderStatus, ProductId, UserId};

use super::user::Address;

/// Delivery address copied onto the order at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub county: Option<String>,
    pub postcode: String,
    pub country: String,
}

impl From<&Address> for ShippingAddress {
    fn from(a: &Address) -> Self {
        Self {
            full_name: a.full_name.clone(),
            phone: a.phone.clone(),
            line1: a.line1.clone(),
            line2: a.line2.clone(),
            city: a.city.clone(),
            county: a.county.clone(),
            postcode: a.postcode.clone(),
            country: a.country.clone(),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub coupon_id: Option<CouponId>,
    pub coupon_code: Option<String>,
    pub note: Option<String>,
    pub tracking_number: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Next statuses an admin may choose.
    #[must_use]
    pub fn next_statuses(&self) -> &'static [OrderStatus] {
        self.status.allowed_transitions()
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderRow {
    pub id: OrderId,
    pub order_number: Option<String>,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub shipping_address: Json<ShippingAddress>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub coupon_id: Option<CouponId>,
    pub coupon_code: Option<String>,
    pub note: Option<String>,
    pub tracking_number: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        let order_number = row
            .order_number
            .unwrap_or_else(|| mistore_core::pricing::order_number(row.created_at, row.id.as_i32()));
        Self {
            id: row.id,
            order_number,
            user_id: row.user_id,
            status: row.status,
            shipping_address: row.shipping_address.0,
            subtotal: row.subtotal,
            discount: row.discount,
            shipping_fee: row.shipping_fee,
            total: row.total,
            coupon_id: row.coupon_id,
            coupon_code: row.coupon_code,
            note: row.note,
            tracking_number: row.tracking_number,
            paid_at: row.paid_at,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Product line of an order, priced at checkout time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Who placed an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerRef {
    pub id: UserId,
    pub email: Email,
    pub name: String,
}

/// An order with its items and customer.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub customer: Option<CustomerRef>,
}

/// Row of the admin order table and the order change feed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin order table filters.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Search over order number, customer email and name.
    pub q: Option<String>,
    /// Placed on or after this day (UTC).
    pub from: Option<NaiveDate>,
    /// Placed on or before this day (UTC).
    pub to: Option<NaiveDate>,
    pub user_id: Option<UserId>,
}

/// Order sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSort {
    #[default]
    Newest,
    Total,
    Status,
    Updated,
}

/// Sort column plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderOrder {
    pub sort: OrderSort,
    pub direction: SortDirection,
}

impl OrderOrder {
    /// Parse `sort` and `dir` query parameters, defaulting to newest first.
    #[must_use]
    pub fn parse(sort: Option<&str>, dir: Option<&str>) -> Self {
        let sort = match sort.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("total") => OrderSort::Total,
            Some("status") => OrderSort::Status,
            Some("updated" | "updated_at") => OrderSort::Updated,
            _ => OrderSort::Newest,
        };
        Self {
            sort,
            direction: SortDirection::from_param(dir),
        }
    }

    /// `ORDER BY` clause body.
    #[must_use]
    pub fn sql(self) -> String {
        let column = match self.sort {
            OrderSort::Newest => "o.created_at",
            OrderSort::Total => "o.total",
            OrderSort::Status => "o.status",
            OrderSort::Updated => "o.updated_at",
        };
        let dir = self.direction.as_sql();
        format!("{column} {dir}, o.id {dir}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_parse() {
        let order = OrderOrder::parse(Some("TOTAL"), Some("asc"));
        assert_eq!(order.sort, OrderSort::Total);
        assert_eq!(order.direction, SortDirection::Asc);
        assert_eq!(order.sql(), "o.total ASC, o.id ASC");

        assert_eq!(OrderOrder::parse(None, None).sql(), "o.created_at DESC, o.id DESC");
    }

    #[test]
    fn test_shipping_address_snapshot() {
        let address = Address {
            id: mistore_core::AddressId::new(3),
            user_id: UserId::new(1),
            full_name: "Ada Lovelace".to_owned(),
            phone: "07700 900123".to_owned(),
            line1: "1 King's Road".to_owned(),
            line2: None,
            city: "London".to_owned(),
            county: None,
            postcode: "SW3 4NY".to_owned(),
            country: "GB".to_owned(),
            is_default: true,
            created_at: Utc::now(),
        };
        let snapshot = ShippingAddress::from(&address);
        assert_eq!(snapshot.postcode, "SW3 4NY");
        assert_eq!(snapshot.full_name, address.full_name);
    }
}
