//! Catalog route handlers.

use std::sync::Arc;

use axum::extract::State;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use mistore_core::ProductStatus;
use mistore_core::pagination::{Page, PageRequest};
use mistore_db::models::{Category, Product, ProductFilter, ProductOrder};
use mistore_db::{CategoryRepository, ProductRepository, storefront_filter};

use crate::error::{ApiPath, ApiQuery, ApiResult, AppError, ok};
use crate::state::AppState;

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    /// `newest`, `price_asc`, `price_desc`, `popular` or `name`.
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProductQuery {
    fn filter(&self) -> ProductFilter {
        storefront_filter(ProductFilter {
            q: self.q.clone(),
            category: self.category.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            featured: self.featured,
            ..ProductFilter::default()
        })
    }
}

/// List active products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Page<Product>> {
    let order = ProductOrder::parse(query.sort.as_deref(), None);
    let page = PageRequest::from_params(query.page, query.page_size);

    let products = ProductRepository::new(state.pool())
        .list(&query.filter(), order, page)
        .await?;
    ok(products)
}

/// Show one product by slug. Unlisted products are not found.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Product> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .filter(|p| p.status == ProductStatus::Active)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    ok(product)
}

/// List categories, served from a 60 second cache.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> ApiResult<Arc<Vec<Category>>> {
    if let Some(cached) = state.category_cache().get(&()).await {
        return ok(cached);
    }

    let categories = Arc::new(CategoryRepository::new(state.pool()).list().await?);
    state
        .category_cache()
        .insert((), Arc::clone(&categories))
        .await;
    ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_filter_is_storefront_scoped() {
        let query = ProductQuery {
            q: Some("redmi".to_string()),
            category: Some("phones".to_string()),
            ..ProductQuery::default()
        };
        let filter = query.filter();
        assert_eq!(filter.status, Some(ProductStatus::Active));
        assert_eq!(filter.category.as_deref(), Some("phones"));
        assert_eq!(filter.low_stock, None);
    }
}
