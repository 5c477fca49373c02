//! Application error type mapping to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use remynd_core::router::RouterError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Command routing failure (store or reply delivery).
    Router(RouterError),
}

impl From<RouterError> for AppError {
    fn from(e: RouterError) -> Self {
        AppError::Router(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Router(RouterError::Store(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                e.to_string(),
            ),
            AppError::Router(RouterError::Notify(e)) => (
                StatusCode::BAD_GATEWAY,
                "CHANNEL_ERROR",
                e.to_string(),
            ),
        };

        let body = json!({
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
