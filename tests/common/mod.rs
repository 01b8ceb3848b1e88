//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use procurement_api::auth::{AuthManager, CredentialVerifier, OwnershipGuard, TokenService};
use procurement_api::database::SqliteDatabase;
use procurement_api::otel::AuthMetrics;
use procurement_api::server::AppState;
use serde_json::{json, Value};

/// Signing secret shared by all integration tests
pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

/// Create a test application state with the given token lifetime
pub async fn create_test_state_with_ttl(ttl: chrono::Duration) -> AppState<SqliteDatabase> {
    let database = create_test_database().await;
    let metrics = Arc::new(AuthMetrics::from_global());
    let tokens = Arc::new(TokenService::new(TEST_SECRET, ttl).expect("valid test secret"));

    let auth_manager = Arc::new(AuthManager::new(
        Arc::clone(&database),
        tokens,
        CredentialVerifier::new(Duration::from_secs(30)),
        Arc::clone(&metrics),
    ));
    let ownership = Arc::new(OwnershipGuard::new(Arc::clone(&database)).with_metrics(metrics));

    AppState {
        auth_manager,
        database,
        ownership,
    }
}

/// Create a test application state with the default 72 hour tokens
pub async fn create_test_state() -> AppState<SqliteDatabase> {
    create_test_state_with_ttl(chrono::Duration::hours(72)).await
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    state: AppState<SqliteDatabase>,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let app = procurement_api::server::build_router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    // Give the server a moment to start (100ms is sufficient for slow CI systems)
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    (addr, shutdown_tx)
}

/// Thin client bound to one test server
pub struct TestClient {
    pub base: String,
    pub http: reqwest::Client,
}

impl TestClient {
    pub fn new(addr: std::net::SocketAddr) -> Self {
        Self {
            base: format!("http://{}/api/v1", addr),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Register an account and return the response body
    pub async fn register(&self, user_name: &str, email: &str, password: &str) -> Value {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(&json!({
                "user_name": user_name,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("register request");
        assert_eq!(response.status(), 201, "register {}", email);
        response.json().await.expect("register body")
    }

    /// Log in and return the bearer token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request");
        assert_eq!(response.status(), 200, "login {}", email);
        let body: Value = response.json().await.expect("login body");
        body["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Register then log in
    pub async fn signup(&self, user_name: &str, email: &str) -> String {
        self.register(user_name, email, "secret123").await;
        self.login(email, "secret123").await
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("GET request")
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.http
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("POST request")
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.http
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("PUT request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.http
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("DELETE request")
    }
}

/// `data.id` of a success envelope
pub fn data_id(body: &Value) -> String {
    body["data"]["id"]
        .as_str()
        .expect("data.id in response")
        .to_string()
}
