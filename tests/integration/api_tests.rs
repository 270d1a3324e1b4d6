//! API integration tests
//!
//! Run against a live server started with `auth.admin_email` and
//! `auth.admin_password` matching `ADMIN_EMAIL` / `ADMIN_PASSWORD`.

use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api";

fn admin_credentials() -> (String, String) {
    (
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@biblio.local".to_string()),
        std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin-password".to_string()),
    )
}

/// Helper to get an admin token
async fn get_auth_token(client: &Client) -> String {
    let (email, password) = admin_credentials();
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["data"]["token"].as_str().expect("No token in response").to_string()
}

async fn post(client: &Client, token: &str, path: &str, body: Value) -> (u16, Value) {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();
    let (email, password) = admin_credentials();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["token"].is_string());
    assert_eq!(body["data"]["token_type"], "Bearer");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let (email, _) = admin_credentials();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "definitely-wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/transactions", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_regular_user_cannot_write() {
    let client = Client::new();
    let email = format!("{}@example.org", unique("clerk"));

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "name": "Clerk", "email": email, "password": "long-enough" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "long-enough" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let token = body["data"]["token"].as_str().expect("No token").to_string();

    let (status, _) = post(&client, &token, "/books", json!({ "title": "Nope" })).await;
    assert_eq!(status, 403);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let (status, book) = post(&client, &token, "/books", json!({ "title": "Dune" })).await;
    assert_eq!(status, 201);
    let book_id = book["data"]["id"].as_str().unwrap().to_string();

    let code = unique("BK");
    let (status, _) = post(&client, &token, "/stocks", json!({ "code": code, "book_id": book_id })).await;
    assert_eq!(status, 201);

    let (status, customer) = post(
        &client,
        &token,
        "/customers",
        json!({ "code": unique("C"), "name": "Paul" }),
    )
    .await;
    assert_eq!(status, 201);
    let customer_id = customer["data"]["id"].as_str().unwrap().to_string();

    let (status, created) = post(
        &client,
        &token,
        "/transactions",
        json!({ "stock_code": code, "customer_id": customer_id }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(created["data"]["status"], "Borrowed");
    assert_eq!(created["data"]["stock"]["status"], "Borrowed");
    let transaction_id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = post(
        &client,
        &token,
        "/transactions",
        json!({ "stock_code": code, "customer_id": customer_id }),
    )
    .await;
    assert!(status == 409 || status == 422);

    let (status, returned) = post(
        &client,
        &token,
        &format!("/transactions/{}/return", transaction_id),
        json!({}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(returned["data"]["status"], "Returned");
    assert!(returned["data"]["return_at"].is_string());
    assert_eq!(returned["data"]["stock"]["status"], "Available");
}

#[tokio::test]
#[ignore]
async fn test_list_transactions_with_filter() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/transactions", BASE_URL))
        .bearer_auth(&token)
        .query(&[("filter", "status:Borrowed,Overdue:in"), ("per_page", "5")])
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"].is_array());
    assert_eq!(body["meta"]["per_page"], 5);
    for row in body["data"].as_array().unwrap() {
        assert!(row["status"] == "Borrowed" || row["status"] == "Overdue");
    }

    let response = client
        .get(format!("{}/transactions", BASE_URL))
        .bearer_auth(&token)
        .query(&[("filter", "password:x:equals")])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_overdue_listing() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/transactions/overdue", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    for row in body["data"].as_array().unwrap() {
        assert_eq!(row["status"], "Overdue");
    }
}
