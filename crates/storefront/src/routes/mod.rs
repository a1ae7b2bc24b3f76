//! HTTP route handlers for the storefront API.
//!
//! Every response uses the `{ success, data | error }` envelope.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database)
//!
//! # Catalog
//! GET    /api/home                        - Home page blocks
//! GET    /api/categories                  - Visible categories
//! GET    /api/products                    - Product search and listing
//! GET    /api/products/{slug}             - Product detail
//!
//! # Auth (register/login are strictly rate limited)
//! POST   /api/auth/register               - Create account and log in
//! POST   /api/auth/login                  - Log in
//! POST   /api/auth/logout                 - Log out
//! GET    /api/auth/me                     - Current user
//!
//! # Cart (requires auth)
//! GET    /api/cart                        - Priced cart
//! DELETE /api/cart                        - Empty cart
//! POST   /api/cart/items                  - Add product
//! PATCH  /api/cart/items/{product_id}     - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}     - Remove product
//!
//! # Addresses (requires auth)
//! GET    /api/addresses                   - List
//! POST   /api/addresses                   - Create
//! DELETE /api/addresses/{id}              - Delete
//!
//! # Checkout and orders (requires auth)
//! POST   /api/coupons/validate            - Preview a coupon against the cart
//! GET    /api/orders                      - Order history
//! POST   /api/orders                      - Checkout
//! GET    /api/orders/{id}                 - Order detail
//! POST   /api/orders/{id}/pay             - Simulated payment
//! POST   /api/orders/{id}/cancel          - Cancel pending order
//!
//! # Lottery
//! GET    /api/lottery                     - Running activities
//! POST   /api/lottery/{id}/draw           - Draw (requires auth)
//! GET    /api/lottery/{id}/draws          - Own draws (requires auth)
//! ```

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod coupons;
pub mod health;
pub mod home;
pub mod lottery;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Routes that create sessions from credentials.
pub fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter())
}

/// Session routes that need no credential throttling.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Catalog routes.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(home::home))
        .route("/categories", get(products::categories))
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
}

/// Cart routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{product_id}", patch(cart::update).delete(cart::remove))
}

/// Address routes.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route("/{id}", delete(addresses::delete))
}

/// Order routes.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/pay", post(orders::pay))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Lottery routes.
pub fn lottery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(lottery::index))
        .route("/{id}/draw", post(lottery::draw))
        .route("/{id}/draws", get(lottery::draws))
}

/// The `/api` tree under the general rate limiter.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .nest("/auth", session_routes())
        .nest("/cart", cart_routes())
        .nest("/addresses", address_routes())
        .route("/coupons/validate", post(coupons::validate))
        .nest("/orders", order_routes())
        .nest("/lottery", lottery_routes())
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", credential_routes())
        .nest("/api", api_routes())
}
