//! Cart repository.
//!
//! Carts are server-side: one `shop.cart_item` row per (user, product).
//! Quantities are capped at current stock when written; checkout re-checks
//! under row locks.

use sqlx::PgPool;
use tracing::instrument;

use mistore_core::{ProductId, ProductStatus, UserId};

use crate::RepositoryError;
use crate::models::CartLine;

/// Repository for shopping carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart joined with current product data, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT ci.product_id, p.name, p.slug, p.image_url, p.price AS unit_price,
                    ci.quantity, p.stock, p.status
             FROM shop.cart_item ci
             JOIN shop.product p ON p.id = ci.product_id
             WHERE ci.user_id = $1
             ORDER BY ci.created_at, ci.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }

    /// Add `quantity` of a product, merging with an existing line. The line
    /// is capped at available stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Rejected` if it is unlisted or sold out.
    #[instrument(skip(self))]
    pub async fn upsert_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        if quantity <= 0 {
            return Err(RepositoryError::Rejected("quantity must be at least 1".to_owned()));
        }
        let stock = self.available_stock(product_id).await?;

        sqlx::query(
            "INSERT INTO shop.cart_item (user_id, product_id, quantity)
             VALUES ($1, $2, LEAST($3, $4))
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = LEAST(shop.cart_item.quantity + EXCLUDED.quantity, $4)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(stock)
        .execute(self.pool)
        .await?;

        self.items_for_user(user_id).await
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    /// Returns `RepositoryError::Rejected` if the quantity exceeds stock.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        if quantity <= 0 {
            return self.remove_item(user_id, product_id).await;
        }
        let stock = self.available_stock(product_id).await?;
        if quantity > stock {
            return Err(RepositoryError::Rejected(format!("only {stock} in stock")));
        }

        let result = sqlx::query(
            "UPDATE shop.cart_item SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.items_for_user(user_id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.items_for_user(user_id).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn available_stock(&self, product_id: ProductId) -> Result<i32, RepositoryError> {
        let row: Option<(ProductStatus, i32)> =
            sqlx::query_as("SELECT status, stock FROM shop.product WHERE id = $1")
                .bind(product_id)
                .fetch_optional(self.pool)
                .await?;

        match row {
            None => Err(RepositoryError::NotFound),
            Some((status, _)) if status != ProductStatus::Active => Err(
                RepositoryError::Rejected("product is not available".to_owned()),
            ),
            Some((_, 0)) => Err(RepositoryError::Rejected("product is out of stock".to_owned())),
            Some((_, stock)) => Ok(stock),
        }
    }
}
