//! Shopping flow: cart, checkout, payment and cancellation.
//!
//! Requires both servers, a migrated database and the `E2E_ADMIN_*`
//! account (products are created through the console).

use mistore_integration_tests::{
    admin, admin_url, create_address, create_product, customer, expect_data, expect_error,
    storefront_url,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn add_to_cart(client: &Client, product_id: &Value, quantity: i32) -> reqwest::Response {
    client
        .post(format!("{}/api/cart/items", storefront_url()))
        .json(&json!({ "product_id": product_id, "quantity": quantity }))
        .send()
        .await
        .expect("Failed to add to cart")
}

async fn product_stock(admin: &Client, product_id: &Value) -> i64 {
    let response = admin
        .get(format!("{}/api/admin/products/{product_id}", admin_url()))
        .send()
        .await
        .expect("Failed to get product");
    expect_data(response, StatusCode::OK).await["stock"]
        .as_i64()
        .expect("stock")
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_cart_requires_login() {
    let response = mistore_integration_tests::client()
        .get(format!("{}/api/cart", storefront_url()))
        .send()
        .await
        .expect("Failed to get cart");
    let body = expect_error(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["error"], "Login required");
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_checkout_pay_and_stock() {
    let admin = admin().await;
    let product = create_product(&admin, "100.00", 5).await;
    let product_id = &product["id"];

    let shopper = customer().await;
    let address_id = create_address(&shopper).await;

    let cart = expect_data(add_to_cart(&shopper, product_id, 2).await, StatusCode::OK).await;
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["subtotal"], "200.00");
    assert_eq!(cart["can_checkout"], true);

    let response = shopper
        .post(format!("{}/api/orders", storefront_url()))
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .expect("Failed to checkout");
    let order = expect_data(response, StatusCode::CREATED).await;
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["items"].as_array().map(Vec::len), Some(1));

    // Stock is reserved at checkout and the cart is emptied
    assert_eq!(product_stock(&admin, product_id).await, 3);
    let response = shopper
        .get(format!("{}/api/cart", storefront_url()))
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(expect_data(response, StatusCode::OK).await["item_count"], 0);

    let order_id = &order["id"];
    let response = shopper
        .post(format!("{}/api/orders/{order_id}/pay", storefront_url()))
        .send()
        .await
        .expect("Failed to pay");
    let paid = expect_data(response, StatusCode::OK).await;
    assert_eq!(paid["status"], "PAID");
    assert!(!paid["paid_at"].is_null());

    // A paid order can no longer be cancelled by the shopper
    let response = shopper
        .post(format!("{}/api/orders/{order_id}/cancel", storefront_url()))
        .send()
        .await
        .expect("Failed to cancel");
    expect_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_cancel_restores_stock() {
    let admin = admin().await;
    let product = create_product(&admin, "25.00", 4).await;
    let product_id = &product["id"];

    let shopper = customer().await;
    let address_id = create_address(&shopper).await;
    expect_data(add_to_cart(&shopper, product_id, 3).await, StatusCode::OK).await;

    let response = shopper
        .post(format!("{}/api/orders", storefront_url()))
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .expect("Failed to checkout");
    let order = expect_data(response, StatusCode::CREATED).await;
    assert_eq!(product_stock(&admin, product_id).await, 1);

    let response = shopper
        .post(format!("{}/api/orders/{}/cancel", storefront_url(), order["id"]))
        .send()
        .await
        .expect("Failed to cancel");
    assert_eq!(expect_data(response, StatusCode::OK).await["status"], "CANCELLED");
    assert_eq!(product_stock(&admin, product_id).await, 4);
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_cart_quantity_is_capped_at_stock() {
    let admin = admin().await;
    let product = create_product(&admin, "10.00", 2).await;
    let product_id = &product["id"];

    let shopper = customer().await;
    let cart = expect_data(add_to_cart(&shopper, product_id, 5).await, StatusCode::OK).await;
    assert_eq!(cart["item_count"], 2);

    // Setting an explicit quantity over stock is refused rather than capped
    let response = shopper
        .patch(format!("{}/api/cart/items/{product_id}", storefront_url()))
        .json(&json!({ "quantity": 3 }))
        .send()
        .await
        .expect("Failed to set quantity");
    expect_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_orders_are_private() {
    let admin = admin().await;
    let product = create_product(&admin, "10.00", 3).await;

    let owner = customer().await;
    let address_id = create_address(&owner).await;
    expect_data(add_to_cart(&owner, &product["id"], 1).await, StatusCode::OK).await;
    let response = owner
        .post(format!("{}/api/orders", storefront_url()))
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .expect("Failed to checkout");
    let order = expect_data(response, StatusCode::CREATED).await;

    let stranger = customer().await;
    let response = stranger
        .get(format!("{}/api/orders/{}", storefront_url(), order["id"]))
        .send()
        .await
        .expect("Failed to get order");
    expect_error(response, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_concurrent_pay_and_cancel_settle_on_one() {
    let admin = admin().await;
    let product = create_product(&admin, "30.00", 4).await;
    let product_id = &product["id"];

    let shopper = customer().await;
    let address_id = create_address(&shopper).await;
    expect_data(add_to_cart(&shopper, product_id, 2).await, StatusCode::OK).await;
    let response = shopper
        .post(format!("{}/api/orders", storefront_url()))
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .expect("Failed to checkout");
    let order = expect_data(response, StatusCode::CREATED).await;
    let order_url = format!("{}/api/orders/{}", storefront_url(), order["id"]);

    let (paid, cancelled) = tokio::join!(
        shopper.post(format!("{order_url}/pay")).send(),
        shopper.post(format!("{order_url}/cancel")).send(),
    );
    let paid = paid.expect("Failed to pay");
    let cancelled = cancelled.expect("Failed to cancel");

    // Exactly one wins; the loser sees the order already moved on
    let (winner, loser, status, stock) = if paid.status() == StatusCode::OK {
        (paid, cancelled, "PAID", 2)
    } else {
        (cancelled, paid, "CANCELLED", 4)
    };
    assert_eq!(expect_data(winner, StatusCode::OK).await["status"], status);
    let body = expect_error(loser, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], format!("order is {status} and can no longer be changed"));

    let response = shopper.get(&order_url).send().await.expect("Failed to get order");
    assert_eq!(expect_data(response, StatusCode::OK).await["status"], status);
    assert_eq!(product_stock(&admin, product_id).await, stock);
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_refund_before_shipping_restores_stock() {
    let admin = admin().await;
    let product = create_product(&admin, "40.00", 3).await;
    let product_id = &product["id"];

    let shopper = customer().await;
    let address_id = create_address(&shopper).await;
    expect_data(add_to_cart(&shopper, product_id, 2).await, StatusCode::OK).await;
    let response = shopper
        .post(format!("{}/api/orders", storefront_url()))
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .expect("Failed to checkout");
    let order = expect_data(response, StatusCode::CREATED).await;
    let response = shopper
        .post(format!("{}/api/orders/{}/pay", storefront_url(), order["id"]))
        .send()
        .await
        .expect("Failed to pay");
    expect_data(response, StatusCode::OK).await;
    assert_eq!(product_stock(&admin, product_id).await, 1);

    let response = admin
        .patch(format!("{}/api/admin/orders/{}/status", admin_url(), order["id"]))
        .json(&json!({ "status": "REFUNDED" }))
        .send()
        .await
        .expect("Failed to refund");
    assert_eq!(expect_data(response, StatusCode::OK).await["status"], "REFUNDED");
    assert_eq!(product_stock(&admin, product_id).await, 3);
}
