//! Error types for nordlys-fc

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::spots::SpotError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or invalid request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. refresh already running or spot id taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No data yet (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Storage failure (500)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<SpotError> for ApiError {
    fn from(e: SpotError) -> Self {
        match e {
            SpotError::Invalid(e) => ApiError::BadRequest(e.to_string()),
            SpotError::DuplicateId(_) | SpotError::Curated(_) => ApiError::Conflict(e.to_string()),
            SpotError::NotFound(id) => ApiError::NotFound(format!("Spot {}", id)),
            SpotError::Storage(e) => ApiError::Other(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg)
            }
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

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

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::Conflict("Refresh already running".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["message"], "Refresh already running");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ApiError::ServiceUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Other(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_spot_error_mapping() {
        let cases = [
            (
                SpotError::Invalid(nordlys_common::Error::InvalidInput("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (SpotError::DuplicateId("a".into()), StatusCode::CONFLICT),
            (SpotError::Curated("a".into()), StatusCode::CONFLICT),
            (SpotError::NotFound("a".into()), StatusCode::NOT_FOUND),
            (
                SpotError::Storage(sqlx::Error::PoolClosed),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), expected);
        }
    }
}
