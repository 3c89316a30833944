/// Todo endpoints, always scoped to their list
///
/// ```text
/// POST   /todo-lists/:listId/todos          {description, completed?} -> Todo
/// GET    /todo-lists/:listId/todos                                    -> [Todo]
/// GET    /todo-lists/:listId/todos/:todoId                            -> Todo
/// PATCH  /todo-lists/:listId/todos/:todoId  {description?, completed?} -> Todo
/// DELETE /todo-lists/:listId/todos/:todoId                            -> {id}
/// ```
///
/// Body checks run before path checks on create and patch, so a request
/// with an empty body is a 400 about the body whatever the ids are.

use super::{deleted, DeletedResponse};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{parse_flag, parse_id, JsonBody, PathParams},
};
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use todo_shared::{
    models::todo::{CreateTodo, Todo, UpdateTodo},
    store::StoreError,
};
use validator::Validate;

/// Create todo request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTodoRequest {
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: Option<String>,

    pub completed: Option<Value>,
}

/// Patch todo request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTodoRequest {
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: Option<String>,

    pub completed: Option<Value>,
}

fn list_id(raw: &str) -> ApiResult<i32> {
    parse_id(raw).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "The path todo list id must be a valid number, got: '{}'",
            raw
        ))
    })
}

fn todo_id(raw: &str) -> ApiResult<i32> {
    parse_id(raw).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "The path todo id must be a valid number, got: '{}'",
            raw
        ))
    })
}

fn completed_flag(value: &Value) -> ApiResult<bool> {
    parse_flag(value).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Completed field must be true or false, got: {}",
            value
        ))
    })
}

pub async fn create_todo(
    State(state): State<AppState>,
    PathParams(raw_list_id): PathParams<String>,
    JsonBody(req): JsonBody<CreateTodoRequest>,
) -> ApiResult<Json<Todo>> {
    req.validate()?;

    let description = req
        .description
        .ok_or_else(|| ApiError::BadRequest("Description field is required".to_string()))?;
    let list_id = list_id(&raw_list_id)?;
    let completed = match &req.completed {
        Some(value) => completed_flag(value)?,
        None => false,
    };

    let todo = state
        .store
        .create_todo(CreateTodo {
            list_id,
            description,
            completed,
        })
        .await
        .map_err(|err| match err {
            StoreError::RelatedRecordNotFound { cause } => ApiError::BadRequest(format!(
                "Todo list id {} is a non-existent todo list id. Detailed error message: {}",
                list_id, cause
            )),
            other => other.into(),
        })?;

    tracing::debug!(todo_id = todo.id, list_id, "Created todo");

    Ok(Json(todo))
}

pub async fn list_todos(
    State(state): State<AppState>,
    PathParams(raw_list_id): PathParams<String>,
) -> ApiResult<Json<Vec<Todo>>> {
    let list_id = list_id(&raw_list_id)?;

    if state.store.find_todo_list(list_id).await?.is_none() {
        return Err(ApiError::NotFound("Todo list not found".to_string()));
    }

    Ok(Json(state.store.list_todos(list_id).await?))
}

pub async fn get_todo(
    State(state): State<AppState>,
    PathParams((raw_list_id, raw_todo_id)): PathParams<(String, String)>,
) -> ApiResult<Json<Todo>> {
    let list_id = list_id(&raw_list_id)?;
    let id = todo_id(&raw_todo_id)?;

    state
        .store
        .find_todo(list_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Todo not found".to_string()))
}

pub async fn update_todo(
    State(state): State<AppState>,
    PathParams((raw_list_id, raw_todo_id)): PathParams<(String, String)>,
    JsonBody(req): JsonBody<UpdateTodoRequest>,
) -> ApiResult<Json<Todo>> {
    if req.description.is_none() && req.completed.is_none() {
        return Err(ApiError::BadRequest(
            "Either description or completed fields must be specified".to_string(),
        ));
    }
    req.validate()?;

    let list_id = list_id(&raw_list_id)?;
    let id = todo_id(&raw_todo_id)?;

    let changes = UpdateTodo {
        completed: req.completed.as_ref().map(completed_flag).transpose()?,
        description: req.description,
    };

    state
        .store
        .update_todo(list_id, id, changes)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Todo list id {} and todo id {} must be valid ids. Detailed error message: no todo {} in todo list {}",
                list_id, id, id, list_id
            ))
        })
}

pub async fn delete_todo(
    State(state): State<AppState>,
    PathParams((raw_list_id, raw_todo_id)): PathParams<(String, String)>,
) -> ApiResult<Json<DeletedResponse>> {
    let list_id = list_id(&raw_list_id)?;
    let id = todo_id(&raw_todo_id)?;

    let rows = state.store.delete_todo(list_id, id).await?;

    deleted(id, rows, "Todo not found")
}
