//! Dashboard aggregates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use mistore_core::{OrderStatus, round_money};

use crate::RepositoryError;
use crate::models::{
    AnalyticsSummary, DailyRevenue, LowStockProduct, StatusCount, TopProduct, fill_daily_series,
};

/// Products at or below this stock appear in the low-stock list.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

const TOP_PRODUCTS: i64 = 5;
const LOW_STOCK_LIMIT: i64 = 10;

/// Read-only reporting queries over orders, products and users.
pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    /// Create a new analytics repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Figures for orders placed in `[from, to)`.
    ///
    /// Revenue counts paid, shipped and delivered orders only. Days are UTC.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<AnalyticsSummary, RepositoryError> {
        let revenue_statuses = revenue_statuses();

        let (revenue, order_count): (Decimal, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(total), 0), COUNT(*)
             FROM shop.order
             WHERE created_at >= $1 AND created_at < $2
               AND UPPER(status::text) = ANY($3)",
        )
        .bind(from)
        .bind(to)
        .bind(&revenue_statuses)
        .fetch_one(self.pool)
        .await?;

        let orders_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count
             FROM shop.order
             WHERE created_at >= $1 AND created_at < $2
             GROUP BY status
             ORDER BY status",
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        let daily = sqlx::query_as::<_, DailyRevenue>(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                    COALESCE(SUM(total), 0) AS revenue,
                    COUNT(*) AS orders
             FROM shop.order
             WHERE created_at >= $1 AND created_at < $2
               AND UPPER(status::text) = ANY($3)
             GROUP BY day
             ORDER BY day",
        )
        .bind(from)
        .bind(to)
        .bind(&revenue_statuses)
        .fetch_all(self.pool)
        .await?;

        let top_products = sqlx::query_as::<_, TopProduct>(
            "SELECT i.product_id, MAX(i.product_name) AS name,
                    SUM(i.quantity)::BIGINT AS units,
                    SUM(i.line_total) AS revenue
             FROM shop.order_item i
             JOIN shop.order o ON o.id = i.order_id
             WHERE o.created_at >= $1 AND o.created_at < $2
               AND UPPER(o.status::text) = ANY($3)
             GROUP BY i.product_id
             ORDER BY units DESC, revenue DESC
             LIMIT $4",
        )
        .bind(from)
        .bind(to)
        .bind(&revenue_statuses)
        .bind(TOP_PRODUCTS)
        .fetch_all(self.pool)
        .await?;

        let new_customers: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.user
             WHERE role = 'customer' AND created_at >= $1 AND created_at < $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(self.pool)
        .await?;

        let low_stock = sqlx::query_as::<_, LowStockProduct>(
            "SELECT id, name, stock FROM shop.product
             WHERE status = 'active' AND stock <= $1
             ORDER BY stock, name
             LIMIT $2",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .bind(LOW_STOCK_LIMIT)
        .fetch_all(self.pool)
        .await?;

        let last_day = (to - chrono::TimeDelta::nanoseconds(1)).date_naive();
        let daily_revenue = fill_daily_series(from.date_naive(), last_day, &daily);

        Ok(AnalyticsSummary {
            from,
            to,
            revenue: round_money(revenue),
            order_count,
            average_order_value: average(revenue, order_count),
            orders_by_status,
            daily_revenue,
            top_products,
            new_customers,
            low_stock,
        })
    }
}

/// Upper-case names of statuses counted as revenue, for `= ANY($n)`.
fn revenue_statuses() -> Vec<String> {
    OrderStatus::ALL
        .iter()
        .filter(|s| s.counts_as_revenue())
        .map(|s| s.as_str().to_owned())
        .collect()
}

fn average(revenue: Decimal, count: i64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        round_money(revenue / Decimal::from(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_statuses() {
        assert_eq!(revenue_statuses(), ["PAID", "SHIPPED", "DELIVERED"]);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(Decimal::ZERO, 0), Decimal::ZERO);
        assert_eq!(average(Decimal::from(100), 3), Decimal::new(3333, 2));
    }
}
