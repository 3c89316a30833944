/// Health check endpoint
///
/// Verifies that the store answers a trivial query.
///
/// # Endpoint
///
/// ```text
/// GET /healthcheck
/// ```
///
/// # Response
///
/// ```json
/// { "message": "Database connection ok." }
/// ```
///
/// When the database cannot be reached the endpoint answers 501 with the
/// connection error as the message.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use todo_shared::store::StoreError;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

pub async fn healthcheck(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    match state.store.ping().await {
        Ok(()) => Ok(Json(HealthResponse {
            message: "Database connection ok.".to_string(),
        })),
        Err(StoreError::Unavailable(msg)) => Err(ApiError::NotImplemented(msg)),
        Err(err) => Err(err.into()),
    }
}
