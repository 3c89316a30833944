/// Request extraction helpers
///
/// Clients are lenient about types: ids arrive as strings in paths and
/// sometimes as strings in bodies, and `completed` may be sent as `"true"`.
/// These helpers accept exactly the loose forms the API supports and
/// nothing else.

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{
        path::ErrorKind, rejection::PathRejection, FromRequest, FromRequestParts, MatchedPath,
        Path,
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// JSON body extractor whose rejections render as `ApiError::BadRequest`
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Path extractor that hands undecodable segments to the handler verbatim
///
/// A segment such as `%FF` is not valid UTF-8 once decoded. Instead of
/// rejecting the request, the still-encoded text is passed on so each route
/// reports it through its own id rule (and status code).
#[derive(Debug, Clone, Copy, Default)]
pub struct PathParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(params)) => Ok(Self(params)),
            Err(PathRejection::FailedToDeserializePathParams(err))
                if matches!(err.kind(), ErrorKind::InvalidUtf8InPathParam { .. }) =>
            {
                encoded_params(parts)
                    .and_then(|raw| serde_json::from_value(raw).ok())
                    .map(Self)
                    .ok_or_else(|| ApiError::BadRequest(err.body_text()))
            }
            Err(rejection) => Err(rejection.into()),
        }
    }
}

/// Path parameters as they appear in the URI, without percent-decoding
///
/// One parameter gives a string, several give an array, matching how
/// `Path<String>` and `Path<(String, String)>` deserialize.
fn encoded_params(parts: &Parts) -> Option<Value> {
    let pattern = parts.extensions.get::<MatchedPath>()?.as_str();

    let mut params: Vec<Value> = pattern
        .split('/')
        .zip(parts.uri.path().split('/'))
        .filter(|(template, _)| template.starts_with(':'))
        .map(|(_, segment)| Value::String(segment.to_string()))
        .collect();

    match params.len() {
        0 => None,
        1 => params.pop(),
        _ => Some(Value::Array(params)),
    }
}

/// Parses a path segment as a record id
pub fn parse_id(raw: &str) -> Option<i32> {
    raw.parse::<i32>().ok()
}

/// Reads a body field that must hold an integer, given as a JSON number or
/// as a string of digits
pub fn parse_integer(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

/// Reads a boolean body field, given as a JSON bool or as the strings
/// `"true"` / `"false"` (case-insensitive)
pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}
