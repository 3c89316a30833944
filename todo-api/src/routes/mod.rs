/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Database connectivity check
/// - `users`: Create, read, list and delete users
/// - `todo_lists`: Create, read and delete todo lists
/// - `todos`: Create, read, list, patch and delete todos within a list

pub mod health;
pub mod todo_lists;
pub mod todos;
pub mod users;

use crate::error::{ApiError, ApiResult};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body returned by every successful delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub id: i32,
}

/// Maps the affected row count of a delete onto a response
///
/// Ids are primary keys, so more than one affected row means the table is
/// corrupt; that is reported as an internal error rather than a success.
pub(crate) fn deleted(id: i32, rows: u64, not_found: &str) -> ApiResult<Json<DeletedResponse>> {
    match rows {
        0 => Err(ApiError::NotFound(not_found.to_string())),
        1 => Ok(Json(DeletedResponse { id })),
        n => Err(ApiError::InternalError(format!(
            "delete of id {} affected {} rows",
            id, n
        ))),
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_row_counts() {
        assert_eq!(deleted(3, 1, "User not found").unwrap().0, DeletedResponse { id: 3 });
        assert!(matches!(deleted(3, 0, "User not found"), Err(ApiError::NotFound(_))));
        assert!(matches!(deleted(3, 2, "User not found"), Err(ApiError::InternalError(_))));
    }
}
