/// User endpoints
///
/// ```text
/// POST   /users        {username, email}  -> User
/// GET    /users                           -> [User]
/// GET    /users/:id                       -> User
/// DELETE /users/:id                       -> {id}
/// ```
///
/// Usernames and emails are unique; a duplicate is answered with 409 naming
/// the offending field. A user who still owns todo lists cannot be deleted.

use super::{deleted, DeletedResponse};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{parse_id, JsonBody, PathParams},
};
use axum::{extract::State, Json};
use serde::Deserialize;
use todo_shared::{
    models::user::{CreateUser, User},
    store::StoreError,
};
use validator::Validate;

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(max = 255, message = "Username must be at most 255 characters"))]
    pub username: Option<String>,

    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: Option<String>,
}

fn user_id(raw: &str) -> ApiResult<i32> {
    parse_id(raw).ok_or_else(|| {
        ApiError::BadRequest(format!("User id must be a valid integer, got: '{}'", raw))
    })
}

pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let CreateUserRequest {
        username: Some(username),
        email: Some(email),
    } = req
    else {
        return Err(ApiError::BadRequest(
            "Email and username fields are required.".to_string(),
        ));
    };

    let user = state
        .store
        .create_user(CreateUser { username, email })
        .await?;

    tracing::debug!(user_id = user.id, "Created user");

    Ok(Json(user))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    PathParams(raw_id): PathParams<String>,
) -> ApiResult<Json<User>> {
    let id = user_id(&raw_id)?;

    state
        .store
        .find_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    PathParams(raw_id): PathParams<String>,
) -> ApiResult<Json<DeletedResponse>> {
    let id = user_id(&raw_id)?;

    let rows = state.store.delete_user(id).await.map_err(|err| match err {
        StoreError::StillReferenced { cause } => ApiError::Conflict(format!(
            "User {} still owns todo lists and cannot be deleted. Detailed error message: {}",
            id, cause
        )),
        other => other.into(),
    })?;

    deleted(id, rows, "User not found")
}
