//! Lottery setup in the console and drawing from the storefront.

use mistore_integration_tests::{
    admin, admin_url, client, customer, expect_data, expect_error, storefront_url, unique_slug,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn create_activity(admin: &Client, max_draws: i32) -> Value {
    let response = admin
        .post(format!("{}/api/admin/lottery", admin_url()))
        .json(&json!({
            "name": unique_slug("e2e-lottery"),
            "starts_at": "2020-01-01T00:00:00Z",
            "ends_at": "2099-01-01T00:00:00Z",
            "max_draws_per_user": max_draws,
        }))
        .send()
        .await
        .expect("Failed to create activity");
    expect_data(response, StatusCode::CREATED).await
}

async fn add_prize(admin: &Client, activity: &Value, name: &str, bp: i32) -> reqwest::Response {
    admin
        .post(format!("{}/api/admin/lottery/{}/prizes", admin_url(), activity["id"]))
        .json(&json!({ "name": name, "prize_type": "points", "probability_bp": bp, "points": 10 }))
        .send()
        .await
        .expect("Failed to add prize")
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_odds_cannot_exceed_certainty() {
    let admin = admin().await;
    let activity = create_activity(&admin, 1).await;

    expect_data(add_prize(&admin, &activity, "Big", 6000).await, StatusCode::CREATED).await;
    let body =
        expect_error(add_prize(&admin, &activity, "Bigger", 5000).await, StatusCode::UNPROCESSABLE_ENTITY)
            .await;
    assert!(body["fields"]["probability_bp"].is_array());

    expect_data(add_prize(&admin, &activity, "Rest", 4000).await, StatusCode::CREATED).await;
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_activity_needs_a_prize_to_start() {
    let admin = admin().await;
    let activity = create_activity(&admin, 1).await;

    let response = admin
        .patch(format!("{}/api/admin/lottery/{}/status", admin_url(), activity["id"]))
        .json(&json!({ "status": "active" }))
        .send()
        .await
        .expect("Failed to set status");
    expect_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_draws_are_limited_per_user() {
    let admin = admin().await;
    let activity = create_activity(&admin, 2).await;

    // Certain win keeps the outcome deterministic
    expect_data(add_prize(&admin, &activity, "Points", 10_000).await, StatusCode::CREATED).await;

    let draw_url = format!("{}/api/lottery/{}/draw", storefront_url(), activity["id"]);

    // Drafts are invisible to shoppers
    let shopper = customer().await;
    let response = shopper.post(&draw_url).send().await.expect("Failed to draw");
    expect_error(response, StatusCode::BAD_REQUEST).await;

    let response = admin
        .patch(format!("{}/api/admin/lottery/{}/status", admin_url(), activity["id"]))
        .json(&json!({ "status": "active" }))
        .send()
        .await
        .expect("Failed to set status");
    assert_eq!(expect_data(response, StatusCode::OK).await["status"], "active");

    let response = client().post(&draw_url).send().await.expect("Failed to draw");
    expect_error(response, StatusCode::UNAUTHORIZED).await;

    for remaining in [1, 0] {
        let response = shopper.post(&draw_url).send().await.expect("Failed to draw");
        let outcome = expect_data(response, StatusCode::OK).await;
        assert_eq!(outcome["won"], true);
        assert_eq!(outcome["draws_remaining"], remaining);
    }

    let response = shopper.post(&draw_url).send().await.expect("Failed to draw");
    let body = expect_error(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], "no draws remaining");

    let response = shopper
        .get(format!("{}/api/lottery/{}/draws", storefront_url(), activity["id"]))
        .send()
        .await
        .expect("Failed to list draws");
    assert_eq!(expect_data(response, StatusCode::OK).await.as_array().map(Vec::len), Some(2));

    let response = admin
        .get(format!("{}/api/admin/lottery/{}/draws?limit=1", admin_url(), activity["id"]))
        .send()
        .await
        .expect("Failed to list draws");
    assert_eq!(expect_data(response, StatusCode::OK).await.as_array().map(Vec::len), Some(1));
}
