//! Product table and editor.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use mistore_core::api::{ApiResponse, Deleted};
use mistore_core::pagination::{Page, PageRequest};
use mistore_core::validation::FieldErrors;
use mistore_core::{ProductId, ProductStatus};
use mistore_db::models::{Product, ProductFilter, ProductInput, ProductOrder};
use mistore_db::{LOW_STOCK_THRESHOLD, ProductRepository};

use crate::error::{self, ApiJson, ApiPath, ApiQuery, ApiResult, AppError, created, ok};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index).post(create))
        .route("/products/{id}", get(show).put(update).delete(destroy))
        .route("/products/{id}/stock", patch(update_stock))
}

/// Product table query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
    /// Only products at or under the low-stock threshold.
    pub low_stock: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProductQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            q: self.q.clone(),
            category: self.category.clone(),
            status: self.status,
            min_price: self.min_price,
            max_price: self.max_price,
            low_stock: self.low_stock.unwrap_or(false).then_some(LOW_STOCK_THRESHOLD),
            featured: None,
        }
    }
}

/// Stock edit: an absolute level or a relative adjustment, not both.
#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    pub stock: Option<i32>,
    pub delta: Option<i32>,
}

enum StockChange {
    Set(i32),
    Adjust(i32),
}

impl StockUpdate {
    fn change(&self) -> Result<StockChange, FieldErrors> {
        match (self.stock, self.delta) {
            (Some(stock), None) if stock < 0 => {
                Err(FieldErrors::single("stock", "must be at least 0"))
            }
            (Some(stock), None) => Ok(StockChange::Set(stock)),
            (None, Some(delta)) => Ok(StockChange::Adjust(delta)),
            _ => Err(FieldErrors::single("stock", "send either stock or delta")),
        }
    }
}

/// Every product, any status.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Page<Product>> {
    let order = ProductOrder::parse(query.sort.as_deref(), query.dir.as_deref());
    let page = PageRequest::from_params(query.page, query.page_size);
    ok(ProductRepository::new(state.pool())
        .list(&query.filter(), order, page)
        .await?)
}

#[instrument(skip(state, _admin))]
async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Product> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    ok(product)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, slug = %body.slug))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<ProductInput>,
) -> error::Result<(StatusCode, Json<ApiResponse<Product>>)> {
    body.validate()?;
    let product = ProductRepository::new(state.pool()).create(&body).await?;
    tracing::info!(product_id = %product.id, "Product created");
    created(product)
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<ProductInput>,
) -> ApiResult<Product> {
    body.validate()?;
    ok(ProductRepository::new(state.pool()).update(id, &body).await?)
}

/// Delete a product. Products that appear on orders must be archived instead.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Deleted> {
    ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    ok(Deleted { deleted: true })
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn update_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<StockUpdate>,
) -> ApiResult<Product> {
    let products = ProductRepository::new(state.pool());
    let product = match body.change()? {
        StockChange::Set(stock) => products.set_stock(id, stock).await?,
        StockChange::Adjust(delta) => products.adjust_stock(id, delta).await?,
    };
    tracing::info!(product_id = %id, stock = product.stock, "Stock updated");
    ok(product)
}
