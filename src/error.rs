//! Error types for the repository and its cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Repo Error Enum ==
/// Unified error type for the cache store, the data source and the HTTP layer.
#[derive(Error, Debug)]
pub enum RepoError {
    /// Key or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cache key has expired
    #[error("Key expired: {0}")]
    Expired(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cache is full and eviction failed
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Cache backend could not be reached
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    /// Filter specification failed validation
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Failure reported by the data source
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Value could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for RepoError {
    fn into_response(self) -> Response {
        let status = match &self {
            RepoError::NotFound(_) | RepoError::Expired(_) => StatusCode::NOT_FOUND,
            RepoError::InvalidRequest(_) | RepoError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            RepoError::CacheFull(_) | RepoError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RepoError::DataAccess(_) | RepoError::Serialization(_) | RepoError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RepoError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (RepoError::InvalidFilter("x".into()), StatusCode::BAD_REQUEST),
            (
                RepoError::StoreUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RepoError::DataAccess("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_serialization_from() {
        let err: RepoError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, RepoError::Serialization(_)));
    }
}
