//! Service-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use progress_core::CoreError;

use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A required row (profile, lesson, challenge) does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Already completed: {0}")]
    AlreadyCompleted(String),
    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        ServiceError::InvalidInput(e.to_string())
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) | ServiceError::Store(StoreError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::InvalidInput(_) | ServiceError::Store(StoreError::Constraint(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::AlreadyCompleted(_) | ServiceError::AlreadyClaimed(_) => {
                StatusCode::CONFLICT
            }
            ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::NotFound("profile 1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::AlreadyClaimed("achievement 3".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Store(StoreError::Unavailable("daily_stats".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::from(CoreError::ScoreOutOfRange(120)).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
