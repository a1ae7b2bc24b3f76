//! Dashboard figures.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use mistore_core::{OrderStatus, ProductId};

/// Everything the analytics dashboard shows for one date range.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Sum of totals of paid, shipped and delivered orders.
    pub revenue: Decimal,
    pub order_count: i64,
    pub average_order_value: Decimal,
    pub orders_by_status: Vec<StatusCount>,
    pub daily_revenue: Vec<DailyRevenue>,
    pub top_products: Vec<TopProduct>,
    pub new_customers: i64,
    pub low_stock: Vec<LowStockProduct>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub units: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub stock: i32,
}

/// Fill days without orders with zeros so charts get a continuous series.
#[must_use]
pub fn fill_daily_series(from: NaiveDate, to: NaiveDate, rows: &[DailyRevenue]) -> Vec<DailyRevenue> {
    from.iter_days()
        .take_while(|day| *day <= to)
        .map(|day| {
            rows.iter()
                .find(|r| r.day == day)
                .cloned()
                .unwrap_or(DailyRevenue {
                    day,
                    revenue: Decimal::ZERO,
                    orders: 0,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_daily_series() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 10, day).unwrap_or_default();
        let rows = vec![DailyRevenue {
            day: d(2),
            revenue: Decimal::from(120),
            orders: 3,
        }];
        let series = fill_daily_series(d(1), d(3), &rows);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].revenue, Decimal::ZERO);
        assert_eq!(series[1].orders, 3);
        assert_eq!(series[2].day, d(3));
    }

    #[test]
    fn test_fill_daily_series_empty_range() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap_or_default();
        let before = NaiveDate::from_ymd_opt(2026, 10, 4).unwrap_or_default();
        assert!(fill_daily_series(day, before, &[]).is_empty());
    }
}
