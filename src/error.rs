//! Error types for the cache
//!
//! Provides unified error handling using thiserror. `CacheError` is `Clone`
//! so a single shared computation can hand the same failure to every waiter.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Key is empty, blank or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalidation pattern could not be parsed
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// TTL is not a positive duration
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// The compute function failed; the caller's error is kept as-is
    #[error("Compute failed: {0}")]
    ComputeFailure(Arc<anyhow::Error>),

    /// The compute function panicked
    #[error("Compute panicked: {0}")]
    ComputePanicked(String),

    /// Payload could not be encoded to or decoded from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot file could not be read or written
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Key not present (admin lookups only; a miss inside the store is not an error)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns the compute function's original error, if this is a compute failure.
    pub fn compute_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::ComputeFailure(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidKey(_)
            | CacheError::InvalidPattern(_)
            | CacheError::InvalidTtl(_)
            | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::ComputeFailure(_) | CacheError::ComputePanicked(_) => {
                StatusCode::BAD_GATEWAY
            }
            CacheError::Snapshot(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("firestore unavailable")]
    struct Unavailable;

    #[test]
    fn test_compute_error_is_downcastable() {
        let err = CacheError::ComputeFailure(Arc::new(anyhow::Error::new(Unavailable)));
        let inner = err.compute_error().unwrap();
        assert!(inner.downcast_ref::<Unavailable>().is_some());
        assert_eq!(err.to_string(), "Compute failed: firestore unavailable");
    }

    #[test]
    fn test_clone_shares_compute_error() {
        let err = CacheError::ComputeFailure(Arc::new(anyhow::anyhow!("boom")));
        let cloned = err.clone();
        match (&err, &cloned) {
            (CacheError::ComputeFailure(a), CacheError::ComputeFailure(b)) => {
                assert!(Arc::ptr_eq(a, b))
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::InvalidKey("k".into()), StatusCode::BAD_REQUEST),
            (CacheError::InvalidPattern("p".into()), StatusCode::BAD_REQUEST),
            (CacheError::InvalidTtl("0".into()), StatusCode::BAD_REQUEST),
            (
                CacheError::ComputePanicked("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CacheError::Snapshot("io".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
