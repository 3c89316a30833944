/// Todo list endpoints
///
/// ```text
/// POST   /todo-lists           {ownerId, name}  -> TodoList
/// GET    /todo-lists/:listId                    -> TodoList with todos
/// DELETE /todo-lists/:listId                    -> {id}
/// ```
///
/// `ownerId` may be a JSON number or a string of digits. A malformed
/// `:listId` is reported as 404 here, since no list can live at that path.

use super::{deleted, DeletedResponse};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{parse_id, parse_integer, JsonBody, PathParams},
};
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use todo_shared::{
    models::todo_list::{CreateTodoList, TodoList, TodoListWithTodos},
    store::StoreError,
};
use validator::Validate;

/// Create todo list request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoListRequest {
    pub owner_id: Option<Value>,

    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,
}

fn list_id(raw: &str) -> ApiResult<i32> {
    parse_id(raw).ok_or_else(|| ApiError::NotFound("Todo list id must be a valid int".to_string()))
}

pub async fn create_todo_list(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateTodoListRequest>,
) -> ApiResult<Json<TodoList>> {
    req.validate()?;

    let CreateTodoListRequest {
        owner_id: Some(owner_id),
        name: Some(name),
    } = req
    else {
        return Err(ApiError::BadRequest(
            "Owner and name fields are required".to_string(),
        ));
    };

    let owner_id = parse_integer(&owner_id).ok_or_else(|| {
        ApiError::BadRequest("Owner field must be a valid integer".to_string())
    })?;

    let list = state
        .store
        .create_todo_list(CreateTodoList { owner_id, name })
        .await
        .map_err(|err| match err {
            StoreError::RelatedRecordNotFound { cause } => ApiError::BadRequest(format!(
                "User id {} is a non-existent user id. Detailed error message: {}",
                owner_id, cause
            )),
            other => other.into(),
        })?;

    tracing::debug!(list_id = list.id, owner_id, "Created todo list");

    Ok(Json(list))
}

pub async fn get_todo_list(
    State(state): State<AppState>,
    PathParams(raw_id): PathParams<String>,
) -> ApiResult<Json<TodoListWithTodos>> {
    let id = list_id(&raw_id)?;

    let list = state
        .store
        .find_todo_list(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Todo list not found".to_string()))?;
    let todos = state.store.list_todos(id).await?;

    Ok(Json(list.with_todos(todos)))
}

pub async fn delete_todo_list(
    State(state): State<AppState>,
    PathParams(raw_id): PathParams<String>,
) -> ApiResult<Json<DeletedResponse>> {
    let id = list_id(&raw_id)?;

    let rows = state
        .store
        .delete_todo_list(id)
        .await
        .map_err(|err| match err {
            StoreError::StillReferenced { cause } => ApiError::Conflict(format!(
                "Todo list {} still has todos and cannot be deleted. Detailed error message: {}",
                id, cause
            )),
            other => other.into(),
        })?;

    deleted(id, rows, "Todo list not found")
}
