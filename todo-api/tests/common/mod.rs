/// Common test utilities for API tests
///
/// Builds the full router over an in-memory store and provides small
/// request helpers so tests read as a sequence of HTTP calls.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use todo_api::app::{build_router, AppState};
use todo_api::config::Config;
use todo_shared::store::MemoryStore;
use tower::ServiceExt;

/// Test context containing the router and the store behind it
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
}

/// A decoded response
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub raw: String,
}

impl TestResponse {
    /// The `message` field of an error body
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

impl TestContext {
    /// Creates a new test context with an empty store
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .expect("memory config");

        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config));

        Self { app, store }
    }

    /// Sends a request with an optional JSON body
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    /// Sends a raw request
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let raw = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body, raw }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request("POST", uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> TestResponse {
        self.request("PATCH", uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request("DELETE", uri, None).await
    }

    /// Creates a user and returns its id
    pub async fn create_user(&self, username: &str) -> i64 {
        let response = self
            .post(
                "/users",
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.raw);
        response.body["id"].as_i64().unwrap()
    }

    /// Creates a todo list owned by `owner_id` and returns its id
    pub async fn create_list(&self, owner_id: i64, name: &str) -> i64 {
        let response = self
            .post(
                "/todo-lists",
                serde_json::json!({ "ownerId": owner_id, "name": name }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.raw);
        response.body["id"].as_i64().unwrap()
    }

    /// Creates a todo in `list_id` and returns its id
    pub async fn create_todo(&self, list_id: i64, description: &str) -> i64 {
        let response = self
            .post(
                &format!("/todo-lists/{}/todos", list_id),
                serde_json::json!({ "description": description }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.raw);
        response.body["id"].as_i64().unwrap()
    }
}
