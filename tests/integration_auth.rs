//! Authentication flow integration tests
//!
//! Tests the authentication system including:
//! - Registration and login over HTTP
//! - Bearer token acceptance within the token lifetime
//! - Uniform rejection of expired, forged and malformed tokens

mod common;

use std::time::Duration;

use chrono::Utc;
use common::*;
use procurement_api::auth::TokenService;
use procurement_api::error::UNAUTHORIZED_MESSAGE;
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Test 1: Registration returns the user without a token or hash
#[tokio::test]
async fn test_register_response_shape() {
    let (addr, _shutdown) = run_test_server(create_test_state().await).await;
    let client = TestClient::new(addr);

    let body = client
        .register("alice", "alice@example.com", "secret123")
        .await;

    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["user_name"], "alice");
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert_eq!(body["data"]["role"], "user");
    assert!(body.get("token").is_none());
    assert!(body["data"].get("password_hash").is_none());
}

/// Test 2: Duplicate registration is a conflict
#[tokio::test]
async fn test_register_duplicate_email() {
    let (addr, _shutdown) = run_test_server(create_test_state().await).await;
    let client = TestClient::new(addr);
    client
        .register("alice", "alice@example.com", "secret123")
        .await;

    let response = client
        .http
        .post(client.url("/auth/register"))
        .json(&json!({
            "user_name": "alice2",
            "email": "ALICE@example.com",
            "password": "secret123",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// Test 3: Login returns a token that opens protected routes
#[tokio::test]
async fn test_login_then_protected_route() {
    let (addr, _shutdown) = run_test_server(create_test_state().await).await;
    let client = TestClient::new(addr);
    let registered = client
        .register("alice", "alice@example.com", "secret123")
        .await;

    let response = client
        .http
        .post(client.url("/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["id"], registered["data"]["id"]);
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);

    let response = client.get("/user", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["data"]["email"], "alice@example.com");
}

/// Test 4: Wrong password and unknown email look the same
#[tokio::test]
async fn test_login_failures_are_uniform() {
    let (addr, _shutdown) = run_test_server(create_test_state().await).await;
    let client = TestClient::new(addr);
    client
        .register("alice", "alice@example.com", "secret123")
        .await;

    let mut bodies = Vec::new();
    for (email, password) in [
        ("alice@example.com", "wrong-password"),
        ("nobody@example.com", "secret123"),
    ] {
        let response = client
            .http
            .post(client.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        bodies.push(response.text().await.unwrap());
    }

    assert_eq!(bodies[0], bodies[1]);
}

/// Test 5: Token works within its lifetime and fails after expiry
#[tokio::test]
async fn test_token_expires_end_to_end() {
    let state = create_test_state_with_ttl(chrono::Duration::seconds(1)).await;
    let (addr, _shutdown) = run_test_server(state).await;
    let client = TestClient::new(addr);
    let token = client.signup("alice", "alice@example.com").await;

    let response = client.get("/user", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Expiry is whole seconds; two seconds is always past it
    tokio::time::sleep(Duration::from_millis(2100)).await;

    let response = client.get("/user", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], UNAUTHORIZED_MESSAGE);
}

/// Test 6: Expired, forged, unsigned and malformed tokens get one response
#[tokio::test]
async fn test_rejections_do_not_leak_reason() {
    let state = create_test_state().await;
    let tokens = state.auth_manager.tokens().clone();
    let (addr, _shutdown) = run_test_server(state).await;
    let client = TestClient::new(addr);
    let token = client.signup("alice", "alice@example.com").await;
    let user_id = tokens.validate(&token, Utc::now()).unwrap().user_id;

    let expired = tokens
        .issue(user_id, "user", Utc::now() - chrono::Duration::hours(80))
        .unwrap()
        .token;
    let forged = TokenService::new(
        "a-completely-different-secret-value-000",
        chrono::Duration::hours(72),
    )
    .unwrap()
    .issue(user_id, "user", Utc::now())
    .unwrap()
    .token;
    let mut parts: Vec<&str> = token.split('.').collect();
    // {"alg":"none","typ":"JWT"}
    parts[0] = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
    let unsigned = format!("{}.{}.", parts[0], parts[1]);

    let mut bodies = Vec::new();
    for header in [
        format!("Bearer {}", expired),
        format!("Bearer {}", forged),
        format!("Bearer {}", unsigned),
        "Bearer garbage".to_string(),
        format!("Token {}", token),
        format!("bearer {}", token),
    ] {
        let response = client
            .http
            .get(client.url("/user"))
            .header("Authorization", header.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", header);
        bodies.push(response.text().await.unwrap());
    }

    let missing = client.http.get(client.url("/user")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    bodies.push(missing.text().await.unwrap());

    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
}

/// Test 7: Token stays valid after the account is deleted
#[tokio::test]
async fn test_token_outlives_deleted_account() {
    let (addr, _shutdown) = run_test_server(create_test_state().await).await;
    let client = TestClient::new(addr);
    let token = client.signup("alice", "alice@example.com").await;

    let response = client.delete("/user", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The gate still admits the token; the handler finds no account
    let response = client.get("/user", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Vendor creation re-checks the account
    let response = client
        .post("/vendor", &token, json!({ "vendor_name": "Acme" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test 8: Password change invalidates the old password for login
#[tokio::test]
async fn test_change_password() {
    let (addr, _shutdown) = run_test_server(create_test_state().await).await;
    let client = TestClient::new(addr);
    let token = client.signup("alice", "alice@example.com").await;

    let response = client
        .put(
            "/user/password",
            &token,
            json!({ "old_password": "secret123", "new_password": "newsecret" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .http
        .post(client.url("/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    client.login("alice@example.com", "newsecret").await;
}

/// Test 9: Health check needs no token
#[tokio::test]
async fn test_health_is_public() {
    let (addr, _shutdown) = run_test_server(create_test_state().await).await;

    let response = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}
