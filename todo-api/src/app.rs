/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use todo_api::{app::AppState, config::Config};
/// use todo_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = todo_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::request_log::log_request, routes};
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::{any::Any, sync::Arc};
use todo_shared::store::Store;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Data access for all handlers
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /healthcheck
/// ├── /users
/// │   ├── POST   /
/// │   ├── GET    /
/// │   ├── GET    /:id
/// │   └── DELETE /:id
/// └── /todo-lists
///     ├── POST   /
///     ├── GET    /:listId
///     ├── DELETE /:listId
///     ├── POST   /:listId/todos
///     ├── GET    /:listId/todos
///     ├── GET    /:listId/todos/:todoId
///     ├── PATCH  /:listId/todos/:todoId
///     └── DELETE /:listId/todos/:todoId
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Panic catcher (empty 500)
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Request body logging
pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.allows_any_origin() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/healthcheck", get(routes::health::healthcheck))
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/users/:id",
            get(routes::users::get_user).delete(routes::users::delete_user),
        )
        .route(
            "/todo-lists",
            axum::routing::post(routes::todo_lists::create_todo_list),
        )
        .route(
            "/todo-lists/:list_id",
            get(routes::todo_lists::get_todo_list).delete(routes::todo_lists::delete_todo_list),
        )
        .route(
            "/todo-lists/:list_id/todos",
            get(routes::todos::list_todos).post(routes::todos::create_todo),
        )
        .route(
            "/todo-lists/:list_id/todos/:todo_id",
            get(routes::todos::get_todo)
                .patch(routes::todos::update_todo)
                .delete(routes::todos::delete_todo),
        )
        .fallback(routes::not_found)
        .layer(axum::middleware::from_fn(log_request))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Panics inside a handler are internal errors: logged, answered with an empty 500
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!("Handler panicked: {}", detail);

    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_response_is_empty_500() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
