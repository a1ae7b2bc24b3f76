//! End-to-end tests for Mi Store UK.
//!
//! The tests drive running servers over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! ms-cli migrate && ms-cli seed
//! ms-cli admin create -e e2e-admin@mistore.uk -n "E2E" -p "$E2E_ADMIN_PASSWORD"
//! cargo run -p mistore-storefront &
//! cargo run -p mistore-admin &
//! cargo test -p mistore-integration-tests -- --ignored --test-threads=1
//! ```
//!
//! # Environment
//!
//! - `STOREFRONT_URL` (default `http://localhost:3000`)
//! - `ADMIN_URL` (default `http://localhost:3001`)
//! - `E2E_ADMIN_EMAIL`, `E2E_ADMIN_PASSWORD` - an existing admin account

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Storefront base URL.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Admin base URL.
#[must_use]
pub fn admin_url() -> String {
    std::env::var("ADMIN_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A client that keeps session cookies between requests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A unique email so tests never collide with each other or seed data.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@e2e.mistore.uk", Uuid::new_v4().simple())
}

/// A unique lowercase slug.
#[must_use]
pub fn unique_slug(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Read a response, assert its status and return the `data` member.
///
/// # Panics
///
/// Panics if the status differs or the body is not an envelope.
pub async fn expect_data(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body: Value = response.json().await.expect("Response was not JSON");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    assert_eq!(body["success"], true, "body: {body}");
    body["data"].clone()
}

/// Read a response, assert its status and return the error envelope.
///
/// # Panics
///
/// Panics if the status differs or the body is not an error envelope.
pub async fn expect_error(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body: Value = response.json().await.expect("Response was not JSON");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    assert_eq!(body["success"], false, "body: {body}");
    body
}

/// Register a fresh customer and return their logged-in client.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn customer() -> Client {
    let client = client();
    let response = client
        .post(format!("{}/api/auth/register", storefront_url()))
        .json(&json!({
            "email": unique_email("shopper"),
            "name": "E2E Shopper",
            "password": "correct horse battery",
        }))
        .send()
        .await
        .expect("Failed to register");
    expect_data(response, StatusCode::CREATED).await;
    client
}

/// Log in to the console with the `E2E_ADMIN_*` account.
///
/// # Panics
///
/// Panics if the variables are missing or login fails.
pub async fn admin() -> Client {
    let email = std::env::var("E2E_ADMIN_EMAIL").expect("E2E_ADMIN_EMAIL not set");
    let password = std::env::var("E2E_ADMIN_PASSWORD").expect("E2E_ADMIN_PASSWORD not set");

    let client = client();
    let response = client
        .post(format!("{}/api/admin/auth/login", admin_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in");
    expect_data(response, StatusCode::OK).await;
    client
}

/// Create an active product through the console and return it.
///
/// # Panics
///
/// Panics if creation fails.
pub async fn create_product(admin: &Client, price: &str, stock: i32) -> Value {
    let slug = unique_slug("e2e-phone");
    let response = admin
        .post(format!("{}/api/admin/products", admin_url()))
        .json(&json!({
            "name": format!("E2E {slug}"),
            "slug": slug,
            "price": price,
            "stock": stock,
            "status": "active",
        }))
        .send()
        .await
        .expect("Failed to create product");
    expect_data(response, StatusCode::CREATED).await
}

/// Save a delivery address for the customer and return its ID.
///
/// # Panics
///
/// Panics if creation fails.
pub async fn create_address(customer: &Client) -> i64 {
    let response = customer
        .post(format!("{}/api/addresses", storefront_url()))
        .json(&json!({
            "full_name": "Ada Lovelace",
            "phone": "07700 900123",
            "line1": "10 Downing Street",
            "city": "London",
            "postcode": "SW1A 2AA",
            "is_default": true,
        }))
        .send()
        .await
        .expect("Failed to create address");
    expect_data(response, StatusCode::CREATED).await["id"]
        .as_i64()
        .expect("address id")
}
