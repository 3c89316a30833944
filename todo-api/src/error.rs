/// Error handling for the API server
///
/// Every handler returns `Result<T, ApiError>`. Client errors become a JSON
/// body of the form `{"message": "..."}` with the matching status code;
/// internal errors are logged and answered with an empty 500.
///
/// # Example
///
/// ```
/// use todo_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(name: Option<String>) -> ApiResult<Json<serde_json::Value>> {
///     let name = name.ok_or_else(|| ApiError::BadRequest("Name is required".to_string()))?;
///     Ok(Json(json!({ "name": name })))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use todo_shared::store::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400): missing fields, malformed ids, invalid JSON
    BadRequest(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409): duplicate username/email, delete blocked by children
    Conflict(String),

    /// Not implemented (501): the healthcheck could not reach the database
    NotImplemented(String),

    /// Internal server error (500), body intentionally empty
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                return status.into_response();
            }
            ApiError::NotImplemented(msg) => {
                tracing::error!("Healthcheck failed: {}", msg);
                msg
            }
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => {
                tracing::info!(status = status.as_u16(), "{}", msg);
                msg
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Convert store errors to API errors
///
/// Handlers that can phrase a better message (e.g. naming the missing owner)
/// match on the store error themselves before falling back to this.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { .. } | StoreError::StillReferenced { .. } => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::RelatedRecordNotFound { .. } => ApiError::BadRequest(err.to_string()),
            StoreError::IdsExhausted { .. }
            | StoreError::Unavailable(_)
            | StoreError::Database(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

/// Malformed or non-JSON request bodies are client errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Path parameters that cannot be deserialized
///
/// A route whose pattern and handler disagree is a server bug, reported as 500.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            ApiError::InternalError(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

/// Field validation failures, one message per violated rule
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid ({})", field, e.code),
                })
            })
            .collect();
        messages.sort();

        ApiError::BadRequest(messages.join("; "))
    }
}
