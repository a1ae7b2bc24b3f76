//! Order repository.
//!
//! Checkout and status changes run in a transaction and lock the rows they
//! touch (`FOR UPDATE`), so two checkouts can never sell the same last unit
//! and an order can never take two transitions at once.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use mistore_core::coupon::CouponError;
use mistore_core::pagination::{Page, PageRequest};
use mistore_core::pricing::{OrderTotals, PricingPolicy, order_number};
use mistore_core::{AddressId, OrderId, OrderStatus, UserId};

use super::address::ADDRESS_COLUMNS;
use super::coupon::COUPON_COLUMNS;
use crate::models::order::OrderRow;
use crate::models::{
    Address, CartLine, ChangeCursor, Coupon, CustomerRef, Order, OrderDetail, OrderFilter,
    OrderItem, OrderOrder, OrderSummary, ShippingAddress, non_blank_ref,
};
use crate::{RepositoryError, contains_pattern, count_to_total};

const ORDER_COLUMNS: &str = "o.id, o.order_number, o.user_id, o.status, o.shipping_address, \
                             o.subtotal, o.discount, o.shipping_fee, o.total, o.coupon_id, \
                             o.coupon_code, o.note, o.tracking_number, o.paid_at, o.shipped_at, \
                             o.delivered_at, o.cancelled_at, o.created_at, o.updated_at";

const SUMMARY_SELECT: &str = "
    SELECT o.id, o.order_number, o.status, o.total,
           u.name AS customer_name, u.email AS customer_email,
           (SELECT COUNT(*) FROM shop.order_item oi WHERE oi.order_id = o.id) AS item_count,
           o.created_at, o.updated_at
    FROM shop.order o
    JOIN shop.user u ON u.id = o.user_id";

/// Everything checkout needs from the request.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutRequest<'r> {
    pub user_id: UserId,
    pub address_id: AddressId,
    pub coupon_code: Option<&'r str>,
    pub note: Option<&'r str>,
    pub policy: &'r PricingPolicy,
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn the user's cart into a pending order.
    ///
    /// In one transaction: lock the cart's products, check availability,
    /// redeem the coupon (conditional `used_count` increment), decrement
    /// stock, write the order and its items, and empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Rejected` for an empty cart, unknown address
    /// or unavailable product, and `RepositoryError::Coupon` if the coupon
    /// cannot be applied. Nothing is written in either case.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn checkout(&self, request: CheckoutRequest<'_>) -> Result<OrderDetail, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.address WHERE id = $1 AND user_id = $2"
        ))
        .bind(request.address_id)
        .bind(request.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::Rejected("delivery address not found".to_owned()))?;

        // Lock in product ID order so concurrent checkouts can't deadlock
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT ci.product_id, p.name, p.slug, p.image_url, p.price AS unit_price,
                    ci.quantity, p.stock, p.status
             FROM shop.cart_item ci
             JOIN shop.product p ON p.id = ci.product_id
             WHERE ci.user_id = $1
             ORDER BY p.id
             FOR UPDATE OF p",
        )
        .bind(request.user_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(RepositoryError::Rejected("cart is empty".to_owned()));
        }
        if let Some(problem) = lines.iter().find_map(CartLine::problem) {
            return Err(RepositoryError::Rejected(problem));
        }

        let amounts: Vec<_> = lines.iter().map(CartLine::amount).collect();

        let coupon = match request.coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
            None => None,
            Some(code) => {
                let coupon = sqlx::query_as::<_, Coupon>(&format!(
                    "SELECT {COUPON_COLUMNS} FROM shop.coupon
                     WHERE UPPER(code) = UPPER($1)
                     FOR UPDATE"
                ))
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(CouponError::NotFound)?;

                let subtotal = OrderTotals::compute(&amounts, None, request.policy).subtotal;
                coupon.rules().check_eligibility(now, subtotal)?;
                Some(coupon)
            }
        };

        let rules = coupon.as_ref().map(Coupon::rules);
        let totals = OrderTotals::compute(&amounts, rules.as_ref(), request.policy);

        if let Some(c) = &coupon {
            let redeemed = sqlx::query(
                "UPDATE shop.coupon SET used_count = used_count + 1
                 WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
            )
            .bind(c.id)
            .execute(&mut *tx)
            .await?;
            if redeemed.rows_affected() == 0 {
                return Err(CouponError::UsageLimitReached.into());
            }
        }

        for line in &lines {
            let updated = sqlx::query(
                "UPDATE shop.product
                 SET stock = stock - $2, sales_count = sales_count + $2
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(RepositoryError::Rejected(format!(
                    "only {} left of {}",
                    line.stock, line.name
                )));
            }
        }

        let order_id: OrderId = sqlx::query_scalar(
            "SELECT nextval(pg_get_serial_sequence('shop.order', 'id'))::INTEGER",
        )
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO shop.order
                (id, order_number, user_id, address_id, shipping_address, status,
                 subtotal, discount, shipping_fee, total, coupon_id, coupon_code, note, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(order_id)
        .bind(order_number(now, order_id.as_i32()))
        .bind(request.user_id)
        .bind(address.id)
        .bind(Json(ShippingAddress::from(&address)))
        .bind(OrderStatus::Pending)
        .bind(totals.subtotal)
        .bind(totals.discount)
        .bind(totals.shipping_fee)
        .bind(totals.total)
        .bind(coupon.as_ref().map(|c| c.id))
        .bind(coupon.as_ref().map(|c| c.code.clone()))
        .bind(non_blank_ref(request.note))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut items = QueryBuilder::<Postgres>::new(
            "INSERT INTO shop.order_item
                (order_id, product_id, product_name, unit_price, quantity, line_total) ",
        );
        items.push_values(&lines, |mut b, line| {
            b.push_bind(order_id)
                .push_bind(line.product_id)
                .push_bind(line.name.clone())
                .push_bind(line.unit_price)
                .push_bind(line.quantity)
                .push_bind(line.line_total());
        });
        items.build().execute(&mut *tx).await?;

        sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(request.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            total = %totals.total,
            coupon = ?coupon.as_ref().map(|c| &c.code),
            "Order placed"
        );

        self.get_detail(order_id, Some(request.user_id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.order WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order o
             WHERE o.user_id = $1
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Order::from).collect(),
            page,
            count_to_total(total),
        ))
    }

    /// An order, optionally restricted to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: OrderId,
        owner: Option<UserId>,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order o
             WHERE o.id = $1 AND ($2::INTEGER IS NULL OR o.user_id = $2)"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Order::from))
    }

    /// An order with items and customer, optionally restricted to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(
        &self,
        id: OrderId,
        owner: Option<UserId>,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(order) = self.get(id, owner).await? else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, product_name, unit_price, quantity, line_total
             FROM shop.order_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let customer = sqlx::query_as::<_, CustomerRef>(
            "SELECT id, email, name FROM shop.user WHERE id = $1",
        )
        .bind(order.user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(Some(OrderDetail {
            order,
            items,
            customer,
        }))
    }

    /// Filtered, sorted page of orders for the admin table.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &OrderFilter,
        order: OrderOrder,
        page: PageRequest,
    ) -> Result<Page<OrderSummary>, RepositoryError> {
        let mut count = QueryBuilder::new(
            "SELECT COUNT(*) FROM shop.order o JOIN shop.user u ON u.id = o.user_id WHERE TRUE",
        );
        push_order_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let mut query = QueryBuilder::new(SUMMARY_SELECT);
        query.push(" WHERE TRUE");
        push_order_filters(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(order.sql())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query
            .build_query_as::<OrderSummary>()
            .fetch_all(self.pool)
            .await?;
        Ok(Page::new(items, page, count_to_total(total)))
    }

    /// Move an order to `next`, if the transition is allowed.
    ///
    /// Stamps the matching `*_at` column. Cancelling, or refunding an order
    /// that never shipped, returns the items to stock and gives the coupon
    /// use back. With `owner`, only that user's order can be changed. With
    /// `expected`, the change only goes through if the order is still in
    /// that status once locked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist (or
    /// is not the owner's), `RepositoryError::Rejected` if it has left
    /// `expected`, and `RepositoryError::Transition` if `next` is not
    /// reachable from the current status.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        tracking_number: Option<&str>,
        owner: Option<UserId>,
        expected: Option<OrderStatus>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: OrderStatus = sqlx::query_scalar(
            "SELECT status FROM shop.order
             WHERE id = $1 AND ($2::INTEGER IS NULL OR user_id = $2)
             FOR UPDATE",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        check_expected_status(current, expected)?;
        current.transition(next)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE shop.order o
             SET status = $2,
                 paid_at = CASE WHEN $2 = 'paid' THEN NOW() ELSE paid_at END,
                 shipped_at = CASE WHEN $2 = 'shipped' THEN NOW() ELSE shipped_at END,
                 delivered_at = CASE WHEN $2 = 'delivered' THEN NOW() ELSE delivered_at END,
                 cancelled_at = CASE WHEN $2 = 'cancelled' THEN NOW() ELSE cancelled_at END,
                 tracking_number = COALESCE($3, tracking_number)
             WHERE o.id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(next)
        .bind(non_blank_ref(tracking_number))
        .fetch_one(&mut *tx)
        .await?;

        if current.releases_stock_on(next) {
            sqlx::query(
                "UPDATE shop.product p
                 SET stock = p.stock + oi.quantity,
                     sales_count = GREATEST(p.sales_count - oi.quantity, 0)
                 FROM shop.order_item oi
                 WHERE oi.order_id = $1 AND p.id = oi.product_id",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE shop.coupon SET used_count = GREATEST(used_count - 1, 0)
                 WHERE id = (SELECT coupon_id FROM shop.order WHERE id = $1)",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");
        Ok(row.into())
    }

    /// Orders after `cursor` in `(updated_at, id)` order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn updated_since(
        &self,
        cursor: ChangeCursor,
        limit: i64,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT} WHERE (o.updated_at, o.id) > ($1, $2)
             ORDER BY o.updated_at, o.id LIMIT $3"
        ))
        .bind(cursor.since)
        .bind(cursor.after_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// Refuse a change when the locked order is no longer in `expected`.
fn check_expected_status(
    current: OrderStatus,
    expected: Option<OrderStatus>,
) -> Result<(), RepositoryError> {
    match expected {
        Some(expected) if current != expected => Err(RepositoryError::Rejected(format!(
            "order is {current} and can no longer be changed"
        ))),
        _ => Ok(()),
    }
}

/// Start of `day` in UTC.
fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn push_order_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(status) = filter.status {
        query.push(" AND o.status = ").push_bind(status);
    }
    if let Some(user_id) = filter.user_id {
        query.push(" AND o.user_id = ").push_bind(user_id);
    }
    if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = contains_pattern(q);
        query
            .push(" AND (o.order_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(from) = filter.from {
        query.push(" AND o.created_at >= ").push_bind(day_start(from));
    }
    if let Some(to) = filter.to {
        // Inclusive: everything before the start of the next day
        query
            .push(" AND o.created_at < ")
            .push_bind(day_start(to) + TimeDelta::days(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_start() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap_or_default();
        assert_eq!(day_start(day).to_rfc3339(), "2026-10-16T00:00:00+00:00");
    }

    #[test]
    fn test_status_moved_under_lock_is_rejected() {
        // A pay that committed first leaves the order PAID for the cancel
        let err = check_expected_status(OrderStatus::Paid, Some(OrderStatus::Pending));
        assert!(
            matches!(err, Err(RepositoryError::Rejected(ref msg)) if msg == "order is PAID and can no longer be changed")
        );
        assert!(check_expected_status(OrderStatus::Pending, Some(OrderStatus::Pending)).is_ok());
        assert!(check_expected_status(OrderStatus::Delivered, None).is_ok());
    }

    #[test]
    fn test_filters_render_inclusive_date_range() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM shop.order o WHERE TRUE");
        push_order_filters(
            &mut query,
            &OrderFilter {
                status: Some(OrderStatus::Paid),
                from: NaiveDate::from_ymd_opt(2026, 10, 1),
                to: NaiveDate::from_ymd_opt(2026, 10, 31),
                ..OrderFilter::default()
            },
        );
        let sql = query.sql();
        assert!(sql.contains("o.status = $1"));
        assert!(sql.contains("o.created_at >= $2"));
        assert!(sql.contains("o.created_at < $3"));
    }
}
