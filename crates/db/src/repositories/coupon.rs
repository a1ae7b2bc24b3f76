//! Coupon repository.

use sqlx::PgPool;
use tracing::instrument;

use mistore_core::CouponId;

use crate::RepositoryError;
use crate::models::{Coupon, CouponInput, non_blank_ref};

pub(super) const COUPON_COLUMNS: &str = "id, code, description, coupon_type, value, min_order_amount, \
                              max_discount, usage_limit, used_count, starts_at, ends_at, \
                              is_active, created_at, updated_at";

/// Repository for discount codes.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every coupon, newest first. The admin table filters in memory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM shop.coupon ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM shop.coupon WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Look up a code, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM shop.coupon WHERE UPPER(code) = UPPER($1)"
        ))
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, Coupon>(&format!(
            "INSERT INTO shop.coupon
                (code, description, coupon_type, value, min_order_amount, max_discount,
                 usage_limit, starts_at, ends_at, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(input.normalized_code())
        .bind(non_blank_ref(input.description.as_deref()))
        .bind(input.coupon_type)
        .bind(input.value)
        .bind(input.min_order_amount)
        .bind(input.max_discount)
        .bind(input.usage_limit)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_coupon_write(e, "coupon code already exists"))?;
        Ok(row)
    }

    /// Update a coupon's rules. `used_count` is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    /// Returns `RepositoryError::Conflict` if the new code is taken.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: CouponId, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "UPDATE shop.coupon
             SET code = $2, description = $3, coupon_type = $4, value = $5,
                 min_order_amount = $6, max_discount = $7, usage_limit = $8,
                 starts_at = $9, ends_at = $10, is_active = $11
             WHERE id = $1
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(id)
        .bind(input.normalized_code())
        .bind(non_blank_ref(input.description.as_deref()))
        .bind(input.coupon_type)
        .bind(input.value)
        .bind(input.min_order_amount)
        .bind(input.max_discount)
        .bind(input.usage_limit)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_coupon_write(e, "coupon code already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.coupon WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Flip `is_active` and return the updated coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    #[instrument(skip(self))]
    pub async fn toggle_active(&self, id: CouponId) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "UPDATE shop.coupon SET is_active = NOT is_active WHERE id = $1
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Like [`RepositoryError::on_write`], also reporting CHECK violations.
fn map_coupon_write(e: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_check_violation()
    {
        let message = match db_err.constraint() {
            Some("coupon_usage_within_limit") => "usage limit is below the number of redemptions",
            Some("coupon_window") => "coupon must end after it starts",
            _ => "coupon values out of range",
        };
        return RepositoryError::Rejected(message.to_owned());
    }
    RepositoryError::on_write(e, conflict)
}
