/// Middleware for the API server
///
/// - `request_log`: Logs method, URI and body of every incoming request

pub mod request_log;
