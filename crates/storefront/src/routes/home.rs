//! Home page route handler.

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;
use tracing::instrument;

use mistore_db::models::{Category, HomeSection, Product};
use mistore_db::{CategoryRepository, HomeSectionRepository, ProductRepository};

use crate::error::{AppError, ApiResult, ok};
use crate::state::AppState;

/// A home section with the records it points at resolved.
#[derive(Debug, Clone, Serialize)]
pub struct HomeBlock {
    #[serde(flatten)]
    pub section: HomeSection,
    /// Listed products, in the order the section lists them.
    pub products: Vec<Product>,
    pub category: Option<Category>,
}

/// Display the home page blocks.
///
/// Served from a 60 second cache; sections referencing unlisted products
/// simply show fewer of them.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> ApiResult<Arc<Vec<HomeBlock>>> {
    if let Some(cached) = state.home_cache().get(&()).await {
        return ok(cached);
    }

    let blocks = Arc::new(load_blocks(&state).await?);
    state.home_cache().insert((), Arc::clone(&blocks)).await;
    ok(blocks)
}

async fn load_blocks(state: &AppState) -> Result<Vec<HomeBlock>, AppError> {
    let pool = state.pool();
    let sections = HomeSectionRepository::new(pool).list(true).await?;
    let products = ProductRepository::new(pool);
    let categories = CategoryRepository::new(pool);

    let mut blocks = Vec::with_capacity(sections.len());
    for section in sections {
        let products = products.get_many(&section.product_ids, true).await?;
        let category = match section.category_id {
            Some(id) => categories.get(id).await?,
            None => None,
        };
        blocks.push(HomeBlock {
            section,
            products,
            category,
        });
    }
    Ok(blocks)
}
