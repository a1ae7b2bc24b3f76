//! Category repository.

use sqlx::PgPool;
use tracing::instrument;

use mistore_core::CategoryId;

use crate::RepositoryError;
use crate::models::{Category, CategoryInput, non_blank_ref};

const CATEGORY_SELECT: &str = "
    SELECT c.id, c.name, c.slug, c.description, c.image_url, c.sort_order,
           (SELECT COUNT(*) FROM shop.product p
             WHERE p.category_id = c.id AND p.status = 'active') AS product_count,
           c.created_at, c.updated_at
    FROM shop.category c";

/// Repository for product categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(&format!(
            "{CATEGORY_SELECT} ORDER BY c.sort_order, c.name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} WHERE c.slug = $1"))
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let id: CategoryId = sqlx::query_scalar(
            "INSERT INTO shop.category (name, slug, description, image_url, sort_order)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(input.name.trim())
        .bind(input.slug.trim())
        .bind(non_blank_ref(input.description.as_deref()))
        .bind(non_blank_ref(input.image_url.as_deref()))
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "a category with this slug already exists"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.category
             SET name = $2, slug = $3, description = $4, image_url = $5, sort_order = $6
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.slug.trim())
        .bind(non_blank_ref(input.description.as_deref()))
        .bind(non_blank_ref(input.image_url.as_deref()))
        .bind(input.sort_order)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "a category with this slug already exists"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a category that no product uses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if products still reference it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::on_write(e, "category still has products; move them first")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
