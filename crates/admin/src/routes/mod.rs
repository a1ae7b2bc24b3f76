//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Database reachable
//!
//! # Everything below is under /api/admin and needs an admin session,
//! # except auth/login
//! POST /auth/login, /auth/logout            GET /auth/me
//! GET|POST /products                        GET|PUT|DELETE /products/{id}
//! PATCH /products/{id}/stock
//! GET|POST /categories                      PUT|DELETE /categories/{id}
//! GET /orders, /orders/{id}                 PATCH /orders/{id}/status
//! GET|POST /coupons                         GET|PUT|DELETE /coupons/{id}
//! POST /coupons/{id}/toggle
//! GET|POST /lottery                         GET|PUT|DELETE /lottery/{id}
//! PATCH /lottery/{id}/status                GET /lottery/{id}/draws
//! GET|POST /lottery/{id}/prizes             PUT|DELETE /lottery/{id}/prizes/{prize_id}
//! GET /users                                PATCH /users/{id}/role
//! GET|POST /home-sections                   PUT|DELETE /home-sections/{id}
//! PUT /home-sections/order
//! GET /analytics
//! POST /uploads                             (multipart, size limited)
//! GET /sync/orders, /sync/products
//! ```

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod analytics;
pub mod auth;
pub mod categories;
pub mod coupons;
pub mod health;
pub mod home_sections;
pub mod lottery;
pub mod orders;
pub mod products;
pub mod sync;
pub mod uploads;
pub mod users;

/// Build the admin API router.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(orders::router())
        .merge(coupons::router())
        .merge(lottery::router())
        .merge(users::router())
        .merge(home_sections::router())
        .merge(analytics::router())
        .merge(uploads::router(max_upload_bytes))
        .merge(sync::router())
}

/// Build the complete router.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/admin", api_routes(max_upload_bytes))
}
