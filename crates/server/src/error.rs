// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use playbook_runner_jobs::JobError;
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Execution not found: {0}")]
    NotFound(String),

    #[error("Playbook not found: {0}")]
    PlaybookNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => ApiError::NotFound(id.to_string()),
            JobError::PlaybookNotFound(path) => ApiError::PlaybookNotFound(path.display().to_string()),
            JobError::InvalidHost(host) => ApiError::BadRequest(format!("invalid host entry {host:?}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::NotFound(id) => {
                tracing::warn!(job_id = %id, "Execution not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Execution ID not found", format!("Execution ID: {id}")),
                )
            }
            ApiError::PlaybookNotFound(path) => {
                tracing::warn!(path = %path, "Playbook not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Playbook not found", path.clone()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use playbook_runner_jobs::JobId;
    use std::path::PathBuf;

    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_not_found_returns_404() {
        let id = JobId::new();
        let (status, body) = extract_response(ApiError::from(JobError::NotFound(id)).into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Execution ID not found");
        assert!(body.details.unwrap().contains(&id.to_string()));
    }

    #[tokio::test]
    async fn test_playbook_not_found_returns_404() {
        let err = JobError::PlaybookNotFound(PathBuf::from("/srv/ansible/missing.yml"));
        let (status, body) = extract_response(ApiError::from(err).into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Playbook not found");
        assert_eq!(body.details.as_deref(), Some("/srv/ansible/missing.yml"));
    }

    #[tokio::test]
    async fn test_invalid_host_returns_400() {
        let err = JobError::InvalidHost("10.0.0.1\n[evil]".into());
        let (status, body) = extract_response(ApiError::from(err).into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Bad request");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let err = JobError::Inventory {
            path: PathBuf::from("/srv/inventory/x.ini"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let (status, body) = extract_response(ApiError::from(err).into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let json = serde_json::to_string(&ErrorResponse::new("Test error")).unwrap();
        assert!(json.contains("\"error\":\"Test error\""));
        assert!(!json.contains("details"));

        let json = serde_json::to_string(&ErrorResponse::with_details("Test error", "More info")).unwrap();
        assert!(json.contains("\"details\":\"More info\""));
    }

    #[test]
    fn test_duplicate_is_internal() {
        let err = ApiError::from(JobError::Duplicate(JobId::new()));
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
