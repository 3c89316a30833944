/// Request logging middleware
///
/// Logs every incoming request as
/// `Received <METHOD> <URI> with body: <body>` before it reaches a handler.
/// The body is buffered and handed on unchanged; an empty body is logged as
/// `[No body]`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, Router};
/// use todo_api::middleware::request_log::log_request;
///
/// let app: Router = Router::new().layer(middleware::from_fn(log_request));
/// ```

use crate::error::ApiError;
use axum::{
    body::{self, Body},
    extract::Request,
    middleware::Next,
    response::Response,
};

/// Largest body the middleware will buffer
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn log_request(req: Request, next: Next) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();

    let bytes = body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {}", e)))?;

    if bytes.is_empty() {
        tracing::info!("Received {} {} with body: [No body]", parts.method, parts.uri);
    } else {
        tracing::info!(
            "Received {} {} with body: {}",
            parts.method,
            parts.uri,
            String::from_utf8_lossy(&bytes)
        );
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
