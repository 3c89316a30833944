/// HTTP client for the todo API
///
/// Thin typed wrappers around the endpoints the load scenarios exercise.
/// Every call is timed and recorded in the shared [`Metrics`] with its
/// response status. The request counts as failed unless the API answered
/// 200, and the named check for the call (e.g. `"User created OK"`) passes
/// or fails accordingly.

use crate::metrics::Metrics;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use todo_shared::models::{todo::Todo, todo_list::TodoList, user::User};

/// Client error types
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection, timeout or body decoding failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with something other than 200
    #[error("{check} failed with status {status}")]
    UnexpectedStatus { check: &'static str, status: u16 },
}

/// Client result type alias
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Serialize)]
struct NewUser<'a> {
    username: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTodoList<'a> {
    owner_id: i32,
    name: &'a str,
}

#[derive(Serialize)]
struct TodoFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
}

/// Cheaply cloneable API client; clones share the connection pool and metrics
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    metrics: Arc<Metrics>,
}

impl ApiClient {
    /// Creates a client for the API at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            metrics,
        })
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request and records it under `check`
    async fn send(
        &self,
        check: &'static str,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<reqwest::Response> {
        let started = Instant::now();
        let result = request.send().await;
        let elapsed = started.elapsed();

        match result {
            Ok(response) => {
                let ok = response.status() == StatusCode::OK;
                self.metrics.record_request(elapsed, response.status().as_u16());
                self.metrics.record_check(check, ok);

                if ok {
                    Ok(response)
                } else {
                    tracing::debug!(check, status = %response.status(), "Unexpected response");
                    Err(ClientError::UnexpectedStatus {
                        check,
                        status: response.status().as_u16(),
                    })
                }
            }
            Err(e) => {
                self.metrics.record_request(elapsed, 0);
                self.metrics.record_check(check, false);
                Err(e.into())
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        check: &'static str,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<T> {
        Ok(self.send(check, request).await?.json::<T>().await?)
    }

    pub async fn healthcheck(&self) -> ClientResult<()> {
        self.send("Healthcheck OK", self.http.get(self.url("/healthcheck")))
            .await
            .map(drop)
    }

    pub async fn create_user(&self, username: &str, email: &str) -> ClientResult<User> {
        let request = self
            .http
            .post(self.url("/users"))
            .json(&NewUser { username, email });
        self.send_json("User created OK", request).await
    }

    pub async fn get_user(&self, id: i32) -> ClientResult<User> {
        let request = self.http.get(self.url(&format!("/users/{}", id)));
        self.send_json("User retrieved OK", request).await
    }

    pub async fn delete_user(&self, id: i32) -> ClientResult<()> {
        let request = self.http.delete(self.url(&format!("/users/{}", id)));
        self.send("User deleted OK", request).await.map(drop)
    }

    pub async fn create_todo_list(&self, owner_id: i32, name: &str) -> ClientResult<TodoList> {
        let request = self
            .http
            .post(self.url("/todo-lists"))
            .json(&NewTodoList { owner_id, name });
        self.send_json("Todo list creation OK", request).await
    }

    pub async fn delete_todo_list(&self, id: i32) -> ClientResult<()> {
        let request = self.http.delete(self.url(&format!("/todo-lists/{}", id)));
        self.send("Todo list deletion OK", request).await.map(drop)
    }

    pub async fn create_todo(
        &self,
        list_id: i32,
        description: &str,
        completed: Option<bool>,
    ) -> ClientResult<Todo> {
        let request = self
            .http
            .post(self.url(&format!("/todo-lists/{}/todos", list_id)))
            .json(&TodoFields {
                description: Some(description),
                completed,
            });
        self.send_json("Todo creation OK", request).await
    }

    pub async fn patch_todo(
        &self,
        list_id: i32,
        id: i32,
        description: Option<&str>,
        completed: Option<bool>,
    ) -> ClientResult<Todo> {
        let request = self
            .http
            .patch(self.url(&format!("/todo-lists/{}/todos/{}", list_id, id)))
            .json(&TodoFields {
                description,
                completed,
            });
        self.send_json("Todo patch OK", request).await
    }

    pub async fn delete_todo(&self, list_id: i32, id: i32) -> ClientResult<()> {
        let request = self
            .http
            .delete(self.url(&format!("/todo-lists/{}/todos/{}", list_id, id)));
        self.send("Todo deletion OK", request).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, Duration::from_millis(200), Arc::new(Metrics::new())).unwrap()
    }

    #[test]
    fn test_urls_ignore_trailing_slash() {
        assert_eq!(
            client("http://localhost:3000/").url("/users"),
            "http://localhost:3000/users"
        );
    }

    #[test]
    fn test_patch_body_omits_absent_fields() {
        let body = serde_json::to_value(TodoFields {
            description: None,
            completed: Some(true),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "completed": true }));
    }

    #[tokio::test]
    async fn test_connection_failure_is_recorded() {
        // Port 1 is never served in the test environment
        let client = client("http://127.0.0.1:1");

        let result = client.create_user("ada", "ada@test.no").await;
        assert!(matches!(result, Err(ClientError::Http(_))));

        let summary = client.metrics().summary();
        assert_eq!(summary.requests, 1);
        assert_eq!(summary.failed_requests, 1);
        assert_eq!(summary.request_count(Some(0)), 1);
        assert_eq!(summary.checks["User created OK"].fails, 1);
    }
}
