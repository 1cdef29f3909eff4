use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::{GenerationError, GenerationErrorReason};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, reason) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::Generation(e) => {
                let reason = e.reason();
                let (status, message) = match reason {
                    GenerationErrorReason::Timeout => (
                        StatusCode::GATEWAY_TIMEOUT,
                        "The caption provider timed out",
                    ),
                    GenerationErrorReason::RateLimited => (
                        StatusCode::TOO_MANY_REQUESTS,
                        "The caption provider is rate limiting requests",
                    ),
                    GenerationErrorReason::ProviderRejected => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "The caption provider rejected the request",
                    ),
                    GenerationErrorReason::Cancelled => (
                        StatusCode::CONFLICT,
                        "Generation was cancelled by a newer request",
                    ),
                    GenerationErrorReason::Unknown => (
                        StatusCode::BAD_GATEWAY,
                        "An AI processing error occurred",
                    ),
                };
                if reason == GenerationErrorReason::Unknown {
                    tracing::error!("Generation error: {e}");
                } else {
                    tracing::warn!("Generation error: {e}");
                }
                (status, "GENERATION_ERROR", message.to_string(), Some(reason))
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(reason) = reason {
            error["reason"] = json!(reason);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
