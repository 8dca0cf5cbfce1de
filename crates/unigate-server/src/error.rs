//! Server error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use unigate_repository::RepositoryError;

/// Server error type
#[derive(Debug, Clone, PartialEq)]
pub enum ServerError {
    /// Invalid request
    BadRequest(String),

    /// Not found
    NotFound(String),

    /// Duplicate id or lost concurrent update
    Conflict(String),

    /// Internal server error; `detail` is only rendered outside production
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Drop internal details
    pub fn redacted(self) -> Self {
        match self {
            ServerError::Internal { message, .. } => ServerError::Internal {
                message,
                detail: None,
            },
            other => other,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::BadRequest(msg) => write!(f, "Invalid request: {}", msg),
            ServerError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServerError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServerError::Internal { message, .. } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ServerError {}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ServerError::BadRequest(msg)
            | ServerError::NotFound(msg)
            | ServerError::Conflict(msg) => json!({ "error": msg, "status": status.as_u16() }),
            ServerError::Internal { message, detail } => {
                let mut body = json!({ "error": message, "status": status.as_u16() });
                if let Some(detail) = detail {
                    body["detail"] = json!(detail);
                }
                body
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ServerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(msg) => ServerError::BadRequest(msg),
            RepositoryError::MissingPartitionKey { .. }
            | RepositoryError::InvalidQuery(_)
            | RepositoryError::UnknownEntityType(_) => ServerError::BadRequest(err.to_string()),
            RepositoryError::NotFound { .. } => ServerError::NotFound(err.to_string()),
            RepositoryError::Conflict { .. } => ServerError::Conflict(err.to_string()),
            RepositoryError::ContainerProvisioningFailed { .. }
            | RepositoryError::PartitionKeyMismatch { .. }
            | RepositoryError::StoreUnavailable(_) => {
                tracing::error!("Request failed: {}", err);
                ServerError::Internal {
                    message: "Internal server error".to_string(),
                    detail: Some(err.to_string()),
                }
            }
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal {
            message: "Internal server error".to_string(),
            detail: Some(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(err: ServerError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_repository_error_status_mapping() {
        let cases = [
            (RepositoryError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                RepositoryError::MissingPartitionKey {
                    entity: "Job".to_string(),
                    field: "location".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (RepositoryError::not_found("Job", "j1"), StatusCode::NOT_FOUND),
            (
                RepositoryError::Conflict {
                    entity: "Job".to_string(),
                    id: "j1".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                RepositoryError::StoreUnavailable("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn test_missing_partition_key_message() {
        let err: ServerError = RepositoryError::MissingPartitionKey {
            entity: "Job".to_string(),
            field: "location".to_string(),
        }
        .into();
        assert_eq!(
            err,
            ServerError::BadRequest("Job ID and location (partition key) are required".to_string())
        );
    }

    #[tokio::test]
    async fn test_internal_detail_is_rendered_until_redacted() {
        let err: ServerError = RepositoryError::PartitionKeyMismatch {
            container: "Jobs".to_string(),
            existing: "/id".to_string(),
            requested: "/location".to_string(),
        }
        .into();

        let (status, body) = body_json(err.clone()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(body["detail"].as_str().unwrap().contains("/location"));

        let (_, body) = body_json(err.redacted()).await;
        assert!(body.get("detail").is_none());
        assert_eq!(body["status"], 500);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ServerError::NotFound("Job not found: j1".to_string()).to_string(),
            "Not found: Job not found: j1"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ServerError>();
    }
}
