//! Home page section repository.

use sqlx::PgPool;
use tracing::instrument;

use mistore_core::HomeSectionId;

use crate::RepositoryError;
use crate::models::{HomeSection, HomeSectionInput, non_blank_ref};

const SECTION_COLUMNS: &str = "id, kind, title, subtitle, image_url, link_url, product_ids, \
                               category_id, sort_order, is_active, created_at, updated_at";

/// Repository for home page sections.
pub struct HomeSectionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HomeSectionRepository<'a> {
    /// Create a new home section repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Sections in display order. The storefront passes `active_only`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<HomeSection>, RepositoryError> {
        let rows = sqlx::query_as::<_, HomeSection>(&format!(
            "SELECT {SECTION_COLUMNS} FROM shop.home_section
             WHERE is_active OR NOT $1
             ORDER BY sort_order, id"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: HomeSectionId) -> Result<Option<HomeSection>, RepositoryError> {
        let row = sqlx::query_as::<_, HomeSection>(&format!(
            "SELECT {SECTION_COLUMNS} FROM shop.home_section WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category does not exist.
    #[instrument(skip(self, input), fields(kind = %input.kind))]
    pub async fn create(&self, input: &HomeSectionInput) -> Result<HomeSection, RepositoryError> {
        let row = sqlx::query_as::<_, HomeSection>(&format!(
            "INSERT INTO shop.home_section
                (kind, title, subtitle, image_url, link_url, product_ids, category_id,
                 sort_order, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {SECTION_COLUMNS}"
        ))
        .bind(input.kind)
        .bind(input.title.trim())
        .bind(non_blank_ref(input.subtitle.as_deref()))
        .bind(non_blank_ref(input.image_url.as_deref()))
        .bind(non_blank_ref(input.link_url.as_deref()))
        .bind(&input.product_ids)
        .bind(input.category_id)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "category not found"))?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the section does not exist.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: HomeSectionId,
        input: &HomeSectionInput,
    ) -> Result<HomeSection, RepositoryError> {
        sqlx::query_as::<_, HomeSection>(&format!(
            "UPDATE shop.home_section
             SET kind = $2, title = $3, subtitle = $4, image_url = $5, link_url = $6,
                 product_ids = $7, category_id = $8, sort_order = $9, is_active = $10
             WHERE id = $1
             RETURNING {SECTION_COLUMNS}"
        ))
        .bind(id)
        .bind(input.kind)
        .bind(input.title.trim())
        .bind(non_blank_ref(input.subtitle.as_deref()))
        .bind(non_blank_ref(input.image_url.as_deref()))
        .bind(non_blank_ref(input.link_url.as_deref()))
        .bind(&input.product_ids)
        .bind(input.category_id)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "category not found"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the section does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: HomeSectionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.home_section WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Apply a new display order: `ids[i]` gets `sort_order = i`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn reorder(&self, ids: &[HomeSectionId]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (position, id) in ids.iter().enumerate() {
            sqlx::query("UPDATE shop.home_section SET sort_order = $2 WHERE id = $1")
                .bind(id)
                .bind(i32::try_from(position).unwrap_or(i32::MAX))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
