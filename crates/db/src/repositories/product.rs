//! Product repository.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use mistore_core::pagination::{Page, PageRequest};
use mistore_core::{ProductId, ProductStatus};

use crate::models::{
    ChangeCursor, Product, ProductFilter, ProductInput, ProductOrder, non_blank_ref,
};
use crate::{RepositoryError, contains_pattern, count_to_total};

const PRODUCT_SELECT: &str = "
    SELECT p.id, p.category_id, c.name AS category_name, c.slug AS category_slug,
           p.name, p.slug, p.description, p.price, p.compare_at_price, p.stock,
           p.status, p.is_featured, p.image_url, p.sales_count,
           p.created_at, p.updated_at
    FROM shop.product p
    LEFT JOIN shop.category c ON c.id = p.category_id";

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, sorted page of products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductFilter,
        order: ProductOrder,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError> {
        let mut count = QueryBuilder::new(
            "SELECT COUNT(*) FROM shop.product p
             LEFT JOIN shop.category c ON c.id = p.category_id WHERE TRUE",
        );
        push_product_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let mut query = QueryBuilder::new(PRODUCT_SELECT);
        query.push(" WHERE TRUE");
        push_product_filters(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(order.sql())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query.build_query_as::<Product>().fetch_all(self.pool).await?;
        Ok(Page::new(items, page, count_to_total(total)))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.slug = $1"))
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Products by ID, in the order the IDs were given. Missing IDs and,
    /// with `active_only`, unlisted products are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[ProductId],
        active_only: bool,
    ) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.id = ANY($1) AND (NOT $2 OR p.status = 'active')"
        ))
        .bind(ids)
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(ids
            .iter()
            .filter_map(|id| rows.iter().find(|p| p.id == *id).cloned())
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category does not exist.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let id: ProductId = sqlx::query_scalar(
            "INSERT INTO shop.product
                (category_id, name, slug, description, price, compare_at_price,
                 stock, status, is_featured, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING id",
        )
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(input.slug.trim())
        .bind(input.description.trim())
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock)
        .bind(input.status)
        .bind(input.is_featured)
        .bind(non_blank_ref(input.image_url.as_deref()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "slug already in use or unknown category"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.product
             SET category_id = $2, name = $3, slug = $4, description = $5, price = $6,
                 compare_at_price = $7, stock = $8, status = $9, is_featured = $10,
                 image_url = $11
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(input.slug.trim())
        .bind(input.description.trim())
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock)
        .bind(input.status)
        .bind(input.is_featured)
        .bind(non_blank_ref(input.image_url.as_deref()))
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "slug already in use or unknown category"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Hard-delete a product. Products that appear on orders cannot be
    /// deleted; archive them instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if orders reference it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::on_write(e, "product appears on orders; archive it instead")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set absolute stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Rejected` for negative stock.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, stock: i32) -> Result<Product, RepositoryError> {
        if stock < 0 {
            return Err(RepositoryError::Rejected("stock cannot be negative".to_owned()));
        }
        let result = sqlx::query("UPDATE shop.product SET stock = $2 WHERE id = $1")
            .bind(id)
            .bind(stock)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Add `delta` (possibly negative) to stock, refusing to go below zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Rejected` if stock would go negative.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.product SET stock = stock + $2 WHERE id = $1 AND stock + $2 >= 0",
        )
        .bind(id)
        .bind(delta)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                None => Err(RepositoryError::NotFound),
                Some(p) => Err(RepositoryError::Rejected(format!(
                    "cannot remove {} units, only {} in stock",
                    -delta, p.stock
                ))),
            };
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Products after `cursor` in `(updated_at, id)` order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn updated_since(
        &self,
        cursor: ChangeCursor,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE (p.updated_at, p.id) > ($1, $2)
             ORDER BY p.updated_at, p.id LIMIT $3"
        ))
        .bind(cursor.since)
        .bind(cursor.after_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

fn push_product_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = contains_pattern(q);
        query
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(slug) = filter.category.as_deref().filter(|s| !s.trim().is_empty()) {
        query.push(" AND c.slug = ").push_bind(slug.trim().to_owned());
    }
    if let Some(status) = filter.status {
        query.push(" AND p.status = ").push_bind(status);
    }
    if let Some(min) = filter.min_price {
        query.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        query.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(threshold) = filter.low_stock {
        query.push(" AND p.stock <= ").push_bind(threshold);
    }
    if let Some(featured) = filter.featured {
        query.push(" AND p.is_featured = ").push_bind(featured);
    }
}

/// Storefront listings only ever show active products.
#[must_use]
pub fn storefront_filter(mut filter: ProductFilter) -> ProductFilter {
    filter.status = Some(ProductStatus::Active);
    filter.low_stock = None;
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_filter_forces_active() {
        let filter = storefront_filter(ProductFilter {
            status: Some(ProductStatus::Draft),
            low_stock: Some(5),
            ..ProductFilter::default()
        });
        assert_eq!(filter.status, Some(ProductStatus::Active));
        assert_eq!(filter.low_stock, None);
    }

    #[test]
    fn test_filters_render_placeholders() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM shop.product p WHERE TRUE");
        push_product_filters(
            &mut query,
            &ProductFilter {
                q: Some("note".to_owned()),
                min_price: Some(rust_decimal::Decimal::from(100)),
                ..ProductFilter::default()
            },
        );
        let sql = query.sql();
        assert!(sql.contains("p.name ILIKE $1 OR p.description ILIKE $2"));
        assert!(sql.contains("p.price >= $3"));
    }
}
