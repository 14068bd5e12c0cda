use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that surface through the HTTP handler layer. Provider failures
/// inside a call session are recovered in-session and never reach here.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
