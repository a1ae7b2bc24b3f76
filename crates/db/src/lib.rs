//! Database layer for Mi Store UK.
//!
//! # Database
//!
//! A single `PostgreSQL` database shared by the storefront and admin
//! binaries. Store tables live in the `shop` schema; tower-sessions tables
//! live in `tower_sessions`.
//!
//! ## Tables
//!
//! - `shop.user`, `shop.address` - Accounts and delivery addresses
//! - `shop.category`, `shop.product` - Catalog
//! - `shop.cart_item` - Server-side carts, one row per (user, product)
//! - `shop.coupon` - Discount codes
//! - `shop.order`, `shop.order_item` - Orders with price snapshots
//! - `shop.lottery_activity`, `shop.lottery_prize`, `shop.lottery_draw`
//! - `shop.home_section` - Home page blocks
//!
//! # Migrations
//!
//! Migrations are stored in `crates/db/migrations/` and embedded as
//! [`MIGRATOR`]. Run them with:
//! ```bash
//! cargo run -p mistore-cli -- migrate
//! ```
//!
//! # Queries
//!
//! Queries are runtime-checked (`sqlx::query_as::<_, Row>`) so the workspace
//! builds without a live database. Dynamic list filters are assembled with
//! [`sqlx::QueryBuilder`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod repositories;

use std::time::Duration;

use mistore_core::coupon::CouponError;
use mistore_core::lottery::OddsError;
use mistore_core::TransitionError;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use repositories::{
    AddressRepository, AnalyticsRepository, CartRepository, CategoryRepository, CheckoutRequest,
    CouponRepository, HomeSectionRepository, LOW_STOCK_THRESHOLD, LotteryRepository,
    OrderRepository, ProductRepository, UserRepository, storefront_filter,
};

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug, row still referenced).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A business rule refused the operation (out of stock, empty cart...).
    #[error("{0}")]
    Rejected(String),

    /// Coupon could not be applied.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// Order status change not allowed.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Lottery prize odds do not add up.
    #[error(transparent)]
    Odds(#[from] OddsError),
}

impl RepositoryError {
    /// Map unique and foreign-key violations on a write to `Conflict`.
    pub(crate) fn on_write(e: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a `COUNT(*)` result to a page total.
pub(crate) fn count_to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// Build an `ILIKE` pattern matching `term` anywhere, with wildcards escaped.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("redmi"), "%redmi%");
        assert_eq!(contains_pattern(" 50%_off "), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_count_to_total() {
        assert_eq!(count_to_total(42), 42);
        assert_eq!(count_to_total(-1), 0);
    }

    #[test]
    fn test_repository_error_messages() {
        assert_eq!(
            RepositoryError::Rejected("cart is empty".to_owned()).to_string(),
            "cart is empty"
        );
        assert_eq!(
            RepositoryError::from(CouponError::Expired).to_string(),
            "coupon has expired"
        );
    }
}
