use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the JSON API.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Input at index {0} is empty; please enter a message to classify")]
    EmptyMessage(usize),
    #[error("No input provided")]
    NoInput,
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),
    #[error("Classification failed: {0}")]
    Inference(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::EmptyMessage(_) | AppError::NoInput => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::EmptyMessage(_) | AppError::NoInput => "invalid_request_error",
            AppError::SessionNotFound(_) => "not_found_error",
            AppError::Inference(_) => "inference_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
