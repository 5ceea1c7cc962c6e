//! Error types for solver operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by solver backends and the job lifecycle.
///
/// Every error is a structured (kind, message) pair. `Clone` so a job's
/// last error can be reported through status snapshots.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SolverError {
    /// Malformed problem, out-of-range index, or missing configuration.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The backend reported a solving failure.
    #[error("solve failed: {0}")]
    SolveFailed(String),

    /// Authentication failed; recoverable via retry.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Transport-layer fault; recoverable via retry.
    #[error("network error: {0}")]
    Network(String),

    /// Protocol-level communication fault; recoverable via retry.
    #[error("communication error: {0}")]
    Communication(String),

    /// `result()` was called before the job reached `Done`, or after its
    /// result was already consumed.
    #[error("asynchronous problem not done: {0}")]
    AsyncNotDone(String),

    /// The job was canceled before completion.
    #[error("problem was canceled")]
    ProblemCanceled,

    /// The backend has not been initialized.
    #[error("backend not initialized")]
    NotInitialized,

    /// The backend ran out of memory.
    #[error("backend out of memory")]
    OutOfMemory,

    /// The backend does not implement the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Any other backend-reported failure, with the backend's numeric code.
    #[error("backend error {code}: {message}")]
    Backend { code: i32, message: String },
}

impl SolverError {
    /// Whether the asynchronous state machine may absorb this fault and
    /// retry, rather than surfacing it to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SolverError::Authentication(_)
                | SolverError::Network(_)
                | SolverError::Communication(_)
        )
    }
}

/// Result type for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_the_taxonomy() {
        assert!(SolverError::Network("reset".into()).is_retryable());
        assert!(SolverError::Communication("eof".into()).is_retryable());
        assert!(SolverError::Authentication("expired".into()).is_retryable());
        assert!(!SolverError::InvalidParameter("bad index".into()).is_retryable());
        assert!(!SolverError::SolveFailed("diverged".into()).is_retryable());
        assert!(!SolverError::ProblemCanceled.is_retryable());
    }
}
