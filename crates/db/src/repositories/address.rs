//! Address repository.

use sqlx::PgPool;
use tracing::instrument;

use mistore_core::{AddressId, UserId};

use crate::RepositoryError;
use crate::models::{Address, AddressInput, non_blank_ref};

pub(super) const ADDRESS_COLUMNS: &str = "id, user_id, full_name, phone, line1, line2, city, county, \
                               postcode, country, is_default, created_at";

/// Repository for saved delivery addresses. Every method is scoped to a user.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.address
             WHERE user_id = $1
             ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One of a user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.address WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Save a new address. The first address, or one marked default, becomes
    /// the user's only default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.address WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        let is_default = input.is_default || existing == 0;

        if is_default {
            sqlx::query("UPDATE shop.address SET is_default = FALSE WHERE user_id = $1 AND is_default")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let country = non_blank_ref(input.country.as_deref())
            .map_or_else(|| "GB".to_owned(), str::to_uppercase);

        let address = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO shop.address
                (user_id, full_name, phone, line1, line2, city, county, postcode, country, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(input.full_name.trim())
        .bind(input.phone.trim())
        .bind(input.line1.trim())
        .bind(non_blank_ref(input.line2.as_deref()))
        .bind(input.city.trim())
        .bind(non_blank_ref(input.county.as_deref()))
        .bind(input.normalized_postcode())
        .bind(country)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Delete one of a user's addresses. If it was the default, the most
    /// recent remaining address takes over.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    #[instrument(skip(self))]
    pub async fn delete_for_user(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let was_default: Option<bool> = sqlx::query_scalar(
            "DELETE FROM shop.address WHERE id = $1 AND user_id = $2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match was_default {
            None => return Err(RepositoryError::NotFound),
            Some(true) => {
                sqlx::query(
                    "UPDATE shop.address SET is_default = TRUE
                     WHERE id = (SELECT id FROM shop.address WHERE user_id = $1
                                 ORDER BY created_at DESC LIMIT 1)",
                )
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            }
            Some(false) => {}
        }

        tx.commit().await?;
        Ok(())
    }
}
