//! Integration tests for the storefront API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - A seeded catalog (cargo run -p copperleaf-cli -- seed)
//! - The storefront running (cargo run -p copperleaf-storefront)
//!
//! Run with: cargo test -p copperleaf-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use copperleaf_integration_tests::storefront_base_url;

/// Create a client with a cookie store so the session cart persists.
fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Test helper: first product id from the catalog listing.
async fn first_product_id(client: &Client) -> i64 {
    let base_url = storefront_base_url();
    let body: Value = client
        .get(format!("{base_url}/api/products?limit=1"))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse listing");
    body["products"][0]["id"]
        .as_i64()
        .expect("catalog is empty; run the seed command first")
}

// ============================================================================
// Health & Catalog
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_product_listing_pagination_shape() {
    let client = session_client();
    let base_url = storefront_base_url();

    let body: Value = client
        .get(format!("{base_url}/api/products?page=1&limit=2"))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse listing");

    assert!(body["products"].is_array());
    assert!(body["pagination"]["total"].is_number());
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 2);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_product_detail_includes_reviews() {
    let client = session_client();
    let base_url = storefront_base_url();
    let id = first_product_id(&client).await;

    let body: Value = client
        .get(format!("{base_url}/api/products/{id}"))
        .send()
        .await
        .expect("Failed to get product")
        .json()
        .await
        .expect("Failed to parse product");

    assert_eq!(body["id"].as_i64(), Some(id));
    assert!(body["reviews"].is_array());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_missing_product_is_404() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/api/products/999999"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_out_of_range_review_is_rejected() {
    let client = session_client();
    let base_url = storefront_base_url();
    let id = first_product_id(&client).await;

    let resp = client
        .post(format!("{base_url}/api/products/{id}/reviews"))
        .json(&json!({ "name": "Tester", "rating": 6, "comment": "too good" }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Cart Flow
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_cart_add_update_remove_flow() {
    let client = session_client();
    let base_url = storefront_base_url();
    let id = first_product_id(&client).await;

    // Add two units
    let body: Value = client
        .post(format!("{base_url}/api/cart/add"))
        .json(&json!({ "product_id": id, "quantity": 2 }))
        .send()
        .await
        .expect("Failed to add to cart")
        .json()
        .await
        .expect("Failed to parse cart");
    assert_eq!(body["item_count"], 2);

    // Same product accumulates
    let body: Value = client
        .post(format!("{base_url}/api/cart/add"))
        .json(&json!({ "product_id": id }))
        .send()
        .await
        .expect("Failed to add to cart")
        .json()
        .await
        .expect("Failed to parse cart");
    assert_eq!(body["item_count"], 3);
    assert_eq!(body["cart"].as_array().map(Vec::len), Some(1));

    // Zero quantity removes the line
    let body: Value = client
        .post(format!("{base_url}/api/cart/update"))
        .json(&json!({ "product_id": id, "quantity": 0 }))
        .send()
        .await
        .expect("Failed to update cart")
        .json()
        .await
        .expect("Failed to parse cart");
    assert_eq!(body["item_count"], 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_cart_add_unknown_product_is_404() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/api/cart/add"))
        .json(&json!({ "product_id": 999999 }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Checkout & Orders
// ============================================================================

fn shipping() -> Value {
    json!({
        "name": "Integration Tester",
        "email": "tester@example.com",
        "street": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "zip": "62701",
        "country": "US"
    })
}

#[tokio::test]
#[ignore = "Requires running storefront server, seeded catalog, and Stripe test keys"]
async fn test_checkout_returns_redirect_url() {
    let client = session_client();
    let base_url = storefront_base_url();
    let id = first_product_id(&client).await;

    let body: Value = client
        .post(format!("{base_url}/api/checkout"))
        .json(&json!({
            "items": [{ "product_id": id, "quantity": 1 }],
            "shipping": shipping()
        }))
        .send()
        .await
        .expect("Failed to check out")
        .json()
        .await
        .expect("Failed to parse checkout response");

    assert!(body["session_id"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(
        body["redirect_url"]
            .as_str()
            .is_some_and(|s| s.starts_with("https://"))
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_empty_cart_is_400() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/api/checkout"))
        .json(&json!({ "items": [], "shipping": shipping() }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_order_history_requires_identity() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/api/orders"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{base_url}/api/orders"))
        .header("x-auth-subject", "auth0|integration-test")
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_session_receipt_is_202_placeholder() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/api/orders/session/cs_test_nonexistent"))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: Value = resp.json().await.expect("Failed to parse placeholder");
    assert_eq!(body["status"], "processing");
    assert_eq!(body["payment_status"], "pending");
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_admin_account_listing_and_stats() {
    let client = session_client();
    let base_url = storefront_base_url();

    let accounts: Value = client
        .get(format!("{base_url}/api/admin/accounts"))
        .send()
        .await
        .expect("Failed to reach server")
        .json()
        .await
        .expect("Failed to parse account listing");
    let accounts = accounts.as_array().expect("listing should be an array");
    for account in accounts {
        assert!(account["order_count"].is_i64());
        assert!(account["subject"].is_string());
    }

    let stats: Value = client
        .get(format!("{base_url}/api/admin/accounts/stats"))
        .send()
        .await
        .expect("Failed to reach server")
        .json()
        .await
        .expect("Failed to parse account stats");
    let total = stats["account_count"].as_i64().expect("account_count");
    let active = stats["active_count"].as_i64().expect("active_count");
    assert_eq!(total, accounts.len() as i64);
    assert!(active <= total);
}

// ============================================================================
// Webhook
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_webhook_rejects_unsigned_delivery() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/api/webhook"))
        .body(r#"{"type":"checkout.session.completed"}"#)
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and STRIPE_WEBHOOK_SECRET"]
async fn test_webhook_ignores_unrelated_signed_event() {
    use copperleaf_storefront::payments::webhook::compute_signature;
    use secrecy::SecretString;

    let secret = SecretString::from(
        std::env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET not set"),
    );
    let client = session_client();
    let base_url = storefront_base_url();

    let body = json!({
        "type": "payment_intent.created",
        "data": { "object": { "id": "pi_123", "metadata": {} } }
    })
    .to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = compute_signature(&secret, &timestamp, &body);

    let resp = client
        .post(format!("{base_url}/api/webhook"))
        .header("Stripe-Signature", format!("t={timestamp},v1={signature}"))
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}
