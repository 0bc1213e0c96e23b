use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::features::analysis::clients::AnalyzerError;
use crate::modules::extraction::ExtractionError;
use crate::modules::staging::StagingError;
use crate::shared::types::ErrorResponse;

/// Message returned for failures whose details stay in the logs
pub const GENERIC_PROCESSING_ERROR: &str = "Error processing PDF file";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        message: String,
        retry_after_secs: u64,
    },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StagingError> for AppError {
    fn from(e: StagingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<AnalyzerError> for AppError {
    fn from(e: AnalyzerError) -> Self {
        AppError::ExternalService(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::QuotaExceeded {
                message,
                retry_after_secs,
            } => {
                let body = Json(ErrorResponse::with_remaining(message, 0));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs),
                );
                return response;
            }
            AppError::ExternalService(msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(msg))
            }
            AppError::Timeout(msg) => {
                tracing::error!("Request timed out: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(msg))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(GENERIC_PROCESSING_ERROR),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_keeps_message() {
        let response = AppError::BadRequest("No file uploaded".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No file uploaded");
        assert!(body.get("remaining").is_none());
    }

    #[tokio::test]
    async fn test_quota_exceeded_sets_remaining_and_retry_after() {
        let response = AppError::QuotaExceeded {
            message: "Limit reached".to_string(),
            retry_after_secs: 3600,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3600");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Limit reached");
        assert_eq!(body["remaining"], 0);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response =
            AppError::Internal("Failed to write /tmp/upload-1.pdf".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], GENERIC_PROCESSING_ERROR);
    }

    #[tokio::test]
    async fn test_analyzer_error_is_surfaced() {
        let err: AppError = AnalyzerError::Api("quota exhausted".to_string()).into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "API Error: quota exhausted");
    }
}
