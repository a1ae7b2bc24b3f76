//! Console flows: access control, catalog edits, fulfilment and coupons.
//!
//! Requires both servers, a migrated database and the `E2E_ADMIN_*`
//! account.

use mistore_integration_tests::{
    admin, admin_url, client, create_address, create_product, customer, expect_data,
    expect_error, storefront_url, unique_email, unique_slug,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_api_requires_session() {
    let response = client()
        .get(format!("{}/api/admin/products", admin_url()))
        .send()
        .await
        .expect("Failed to list products");
    expect_error(response, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_customer_cannot_log_in_to_console() {
    let email = unique_email("not-staff");
    let shopper = client();
    let response = shopper
        .post(format!("{}/api/auth/register", storefront_url()))
        .json(&json!({ "email": email, "name": "Shopper", "password": "correct horse battery" }))
        .send()
        .await
        .expect("Failed to register");
    expect_data(response, StatusCode::CREATED).await;

    let response = client()
        .post(format!("{}/api/admin/auth/login", admin_url()))
        .json(&json!({ "email": email, "password": "correct horse battery" }))
        .send()
        .await
        .expect("Failed to log in");
    let body = expect_error(response, StatusCode::FORBIDDEN).await;
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_product_validation_and_duplicate_slug() {
    let admin = admin().await;

    let response = admin
        .post(format!("{}/api/admin/products", admin_url()))
        .json(&json!({ "name": "", "slug": "Not A Slug", "price": "0" }))
        .send()
        .await
        .expect("Failed to create product");
    let body = expect_error(response, StatusCode::UNPROCESSABLE_ENTITY).await;
    assert!(body["fields"]["name"].is_array());
    assert!(body["fields"]["slug"].is_array());
    assert!(body["fields"]["price"].is_array());

    let product = create_product(&admin, "49.99", 10).await;
    let response = admin
        .post(format!("{}/api/admin/products", admin_url()))
        .json(&json!({ "name": "Copy", "slug": product["slug"], "price": "1.00" }))
        .send()
        .await
        .expect("Failed to create product");
    expect_error(response, StatusCode::CONFLICT).await;
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_stock_set_and_adjust() {
    let admin = admin().await;
    let product = create_product(&admin, "19.99", 10).await;
    let url = format!("{}/api/admin/products/{}/stock", admin_url(), product["id"]);

    let response = admin.patch(&url).json(&json!({ "stock": 3 })).send().await.expect("set");
    assert_eq!(expect_data(response, StatusCode::OK).await["stock"], 3);

    let response = admin.patch(&url).json(&json!({ "delta": 7 })).send().await.expect("adjust");
    assert_eq!(expect_data(response, StatusCode::OK).await["stock"], 10);

    // Stock never goes negative
    let response = admin.patch(&url).json(&json!({ "delta": -11 })).send().await.expect("adjust");
    expect_error(response, StatusCode::BAD_REQUEST).await;

    let response = admin
        .get(format!("{}/api/admin/products?low_stock=true&page_size=100", admin_url()))
        .send()
        .await
        .expect("Failed to list products");
    let page = expect_data(response, StatusCode::OK).await;
    assert!(
        page["items"]
            .as_array()
            .expect("items")
            .iter()
            .all(|p| p["stock"].as_i64().is_some_and(|s| s <= 5))
    );
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_order_lifecycle() {
    let admin = admin().await;
    let product = create_product(&admin, "80.00", 5).await;

    let shopper = customer().await;
    let address_id = create_address(&shopper).await;
    shopper
        .post(format!("{}/api/cart/items", storefront_url()))
        .json(&json!({ "product_id": product["id"], "quantity": 1 }))
        .send()
        .await
        .expect("Failed to add to cart");
    let response = shopper
        .post(format!("{}/api/orders", storefront_url()))
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .expect("Failed to checkout");
    let order = expect_data(response, StatusCode::CREATED).await;
    let status_url = format!("{}/api/admin/orders/{}/status", admin_url(), order["id"]);

    // PENDING cannot jump straight to SHIPPED
    let response = admin
        .patch(&status_url)
        .json(&json!({ "status": "SHIPPED" }))
        .send()
        .await
        .expect("Failed to update status");
    expect_error(response, StatusCode::CONFLICT).await;

    for (status, tracking) in [("PAID", None), ("SHIPPED", Some("RM123456789GB")), ("DELIVERED", None)] {
        let response = admin
            .patch(&status_url)
            .json(&json!({ "status": status, "tracking_number": tracking }))
            .send()
            .await
            .expect("Failed to update status");
        let updated = expect_data(response, StatusCode::OK).await;
        assert_eq!(updated["status"], status);
    }

    let response = admin
        .get(format!("{}/api/admin/orders/{}", admin_url(), order["id"]))
        .send()
        .await
        .expect("Failed to get order");
    let detail = expect_data(response, StatusCode::OK).await;
    assert_eq!(detail["tracking_number"], "RM123456789GB");
    assert!(!detail["delivered_at"].is_null());

    let response = admin
        .get(format!("{}/api/admin/orders?status=DELIVERED&q={}", admin_url(), order["order_number"].as_str().unwrap_or_default()))
        .send()
        .await
        .expect("Failed to list orders");
    assert_eq!(expect_data(response, StatusCode::OK).await["total"], 1);
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_coupon_lifecycle() {
    let admin = admin().await;
    let code = format!("E2E{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase();

    let response = admin
        .post(format!("{}/api/admin/coupons", admin_url()))
        .json(&json!({
            "code": code.to_lowercase(),
            "coupon_type": "fixed_amount",
            "value": "5.00",
            "min_order_amount": "20.00",
        }))
        .send()
        .await
        .expect("Failed to create coupon");
    let coupon = expect_data(response, StatusCode::CREATED).await;
    assert_eq!(coupon["code"], code);

    let response = admin
        .get(format!("{}/api/admin/coupons?q={code}&status=active", admin_url()))
        .send()
        .await
        .expect("Failed to list coupons");
    assert_eq!(expect_data(response, StatusCode::OK).await["total"], 1);

    let response = admin
        .post(format!("{}/api/admin/coupons/{}/toggle", admin_url(), coupon["id"]))
        .send()
        .await
        .expect("Failed to toggle coupon");
    assert_eq!(expect_data(response, StatusCode::OK).await["is_active"], false);

    // Inactive coupons are refused at the storefront
    let shopper = customer().await;
    let product = create_product(&admin, "30.00", 2).await;
    shopper
        .post(format!("{}/api/cart/items", storefront_url()))
        .json(&json!({ "product_id": product["id"], "quantity": 1 }))
        .send()
        .await
        .expect("Failed to add to cart");
    let response = shopper
        .post(format!("{}/api/coupons/validate", storefront_url()))
        .json(&json!({ "code": code }))
        .send()
        .await
        .expect("Failed to validate coupon");
    expect_error(response, StatusCode::BAD_REQUEST).await;

    let response = admin
        .delete(format!("{}/api/admin/coupons/{}", admin_url(), coupon["id"]))
        .send()
        .await
        .expect("Failed to delete coupon");
    assert_eq!(expect_data(response, StatusCode::OK).await["deleted"], true);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_category_with_products_cannot_be_deleted() {
    let admin = admin().await;
    let slug = unique_slug("e2e-category");
    let response = admin
        .post(format!("{}/api/admin/categories", admin_url()))
        .json(&json!({ "name": "E2E Category", "slug": slug }))
        .send()
        .await
        .expect("Failed to create category");
    let category = expect_data(response, StatusCode::CREATED).await;

    let response = admin
        .post(format!("{}/api/admin/products", admin_url()))
        .json(&json!({
            "name": "Categorised",
            "slug": unique_slug("e2e-item"),
            "price": "5.00",
            "category_id": category["id"],
        }))
        .send()
        .await
        .expect("Failed to create product");
    expect_data(response, StatusCode::CREATED).await;

    let response = admin
        .delete(format!("{}/api/admin/categories/{}", admin_url(), category["id"]))
        .send()
        .await
        .expect("Failed to delete category");
    expect_error(response, StatusCode::CONFLICT).await;
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_deleted_product_is_gone() {
    let admin = admin().await;
    let product = create_product(&admin, "15.00", 2).await;
    let product_url = format!("{}/api/admin/products/{}", admin_url(), product["id"]);

    let response = admin.delete(&product_url).send().await.expect("Failed to delete product");
    assert_eq!(expect_data(response, StatusCode::OK).await["deleted"], true);

    let response = admin.get(&product_url).send().await.expect("Failed to get product");
    expect_error(response, StatusCode::NOT_FOUND).await;

    let response = admin
        .get(format!("{}/api/admin/products", admin_url()))
        .query(&[("q", product["slug"].as_str().unwrap_or_default())])
        .send()
        .await
        .expect("Failed to list products");
    let listed = expect_data(response, StatusCode::OK).await;
    assert_eq!(listed["total"], 0);
    assert!(
        listed["items"]
            .as_array()
            .expect("items")
            .iter()
            .all(|p| p["id"] != product["id"])
    );
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_ordered_product_cannot_be_deleted() {
    let admin = admin().await;
    let product = create_product(&admin, "60.00", 3).await;

    let shopper = customer().await;
    let address_id = create_address(&shopper).await;
    shopper
        .post(format!("{}/api/cart/items", storefront_url()))
        .json(&json!({ "product_id": product["id"], "quantity": 1 }))
        .send()
        .await
        .expect("Failed to add to cart");
    let response = shopper
        .post(format!("{}/api/orders", storefront_url()))
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .expect("Failed to checkout");
    expect_data(response, StatusCode::CREATED).await;

    let product_url = format!("{}/api/admin/products/{}", admin_url(), product["id"]);
    let response = admin.delete(&product_url).send().await.expect("Failed to delete product");
    let body = expect_error(response, StatusCode::CONFLICT).await;
    assert_eq!(body["error"], "product appears on orders; archive it instead");

    // Still there
    let response = admin.get(&product_url).send().await.expect("Failed to get product");
    expect_data(response, StatusCode::OK).await;
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_analytics_rejects_reversed_range() {
    let admin = admin().await;
    let response = admin
        .get(format!("{}/api/admin/analytics?from=2026-03-10&to=2026-03-01", admin_url()))
        .send()
        .await
        .expect("Failed to get analytics");
    expect_error(response, StatusCode::UNPROCESSABLE_ENTITY).await;

    let response = admin
        .get(format!("{}/api/admin/analytics?range=7d", admin_url()))
        .send()
        .await
        .expect("Failed to get analytics");
    let summary = expect_data(response, StatusCode::OK).await;
    assert_eq!(summary["daily_revenue"].as_array().map(Vec::len), Some(7));
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_upload_sniffs_content() {
    let admin = admin().await;
    let url = format!("{}/api/admin/uploads", admin_url());
    let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(png).file_name("pixel.png"),
    );
    let response = admin.post(&url).multipart(form).send().await.expect("Failed to upload");
    let image = expect_data(response, StatusCode::CREATED).await;
    assert!(
        image["data_url"]
            .as_str()
            .is_some_and(|u| u.starts_with("data:image/png;base64,"))
    );

    // A text file renamed to .png is still refused
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"hello".to_vec()).file_name("fake.png"),
    );
    let response = admin.post(&url).multipart(form).send().await.expect("Failed to upload");
    expect_error(response, StatusCode::UNSUPPORTED_MEDIA_TYPE).await;
}

/// Follow the product feed from `cursor` until it is drained, returning
/// every id seen and the cursor to resume from.
async fn drain_product_feed(admin: &reqwest::Client, mut cursor: Value) -> (Vec<Value>, Value) {
    let mut seen = Vec::new();
    loop {
        let mut request = admin.get(format!("{}/api/admin/sync/products", admin_url()));
        if let Some(since) = cursor["since"].as_str() {
            let after_id = cursor["after_id"].to_string();
            request = request.query(&[("since", since), ("after_id", after_id.as_str())]);
        }
        let response = request.send().await.expect("Failed to sync");
        let batch = expect_data(response, StatusCode::OK).await;
        let items = batch["items"].as_array().expect("items");
        seen.extend(items.iter().map(|p| p["id"].clone()));
        cursor = batch["next"].clone();
        if batch["has_more"] != true {
            return (seen, cursor);
        }
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_product_sync_feed_delivers_every_change() {
    let admin = admin().await;
    let (_, cursor) = drain_product_feed(&admin, Value::Null).await;

    // More than one batch worth of changes
    let mut created = Vec::new();
    for _ in 0..520 {
        created.push(create_product(&admin, "12.00", 1).await["id"].clone());
    }

    let (seen, _) = drain_product_feed(&admin, cursor).await;
    for id in &created {
        assert!(seen.contains(id), "product {id} missing from feed");
    }
}
