//! HTTP error type for docguard-api
//!
//! Every handler failure renders as `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::policy::PolicyError;
use crate::store::StoreError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. review of an unclassified document
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// docguard-common error
    #[error("Common error: {0}")]
    Common(#[from] docguard_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", err.to_string()),
            ApiError::Policy(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "POLICY_ERROR",
                err.to_string(),
            ),
            ApiError::Extraction(ref err) => {
                (StatusCode::BAD_REQUEST, "EXTRACTION_ERROR", err.to_string())
            }
            ApiError::Store(ref err @ StoreError::NotClassified(_)) => {
                (StatusCode::CONFLICT, "CONFLICT", err.to_string())
            }
            ApiError::Store(ref err) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn conflict_renders_409_envelope() {
        let (status, body) = render(ApiError::Conflict("not classified".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["message"], "not classified");
    }

    #[tokio::test]
    async fn store_errors_map_to_404_and_409() {
        let id = uuid::Uuid::new_v4();
        let (status, _) = render(StoreError::DocumentNotFound(id).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = render(StoreError::NotClassified(id).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"]["message"].as_str().unwrap().contains("not been classified"));
    }

    #[tokio::test]
    async fn common_errors_are_server_errors() {
        let err = ApiError::from(docguard_common::Error::corrupt("status", "archived"));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "COMMON_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("archived"));
    }
}
