pub mod catalog;
pub mod health;
pub mod playlist;

use axum::{http::StatusCode, Json};

/// Error response shared by all handlers
pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}
