// SPDX-License-Identifier: Apache-2.0
//! Error types for native SAPI library interaction.

use alsvid_hal::SolverError;

use crate::ffi;

/// Errors arising from SAPI library operations.
#[derive(Debug, thiserror::Error)]
pub enum SapiError {
    #[error("failed to load SAPI library at '{path}': {cause}")]
    LoadFailed { path: String, cause: String },

    #[error("symbol '{symbol}' not found in SAPI library: {cause}")]
    SymbolNotFound { symbol: String, cause: String },

    #[error("SAPI library not initialized (sapi_globalInit failed with code {0})")]
    InitFailed(i32),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("solve failed: {0}")]
    SolveFailed(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("communication error: {0}")]
    Communication(String),

    #[error("asynchronous problem not done: {0}")]
    AsyncNotDone(String),

    #[error("problem was canceled")]
    ProblemCanceled,

    #[error("SAPI out of memory")]
    OutOfMemory,

    #[error("unknown solver '{0}'")]
    UnknownSolver(String),

    #[error("SAPI call failed with error code {code}: {message}")]
    Sapi { code: i32, message: String },

    #[error("interior NUL in string passed to SAPI: {0}")]
    Nul(#[from] std::ffi::NulError),
}

impl SapiError {
    /// Convert a raw SAPI error code plus message buffer into a typed error.
    pub fn from_code(code: i32, message: String) -> Self {
        match code {
            ffi::SAPI_ERR_INVALID_PARAMETER => SapiError::InvalidParameter(message),
            ffi::SAPI_ERR_SOLVE_FAILED => SapiError::SolveFailed(message),
            ffi::SAPI_ERR_AUTHENTICATION => SapiError::Authentication(message),
            ffi::SAPI_ERR_NETWORK => SapiError::Network(message),
            ffi::SAPI_ERR_COMMUNICATION => SapiError::Communication(message),
            ffi::SAPI_ERR_ASYNC_NOT_DONE => SapiError::AsyncNotDone(message),
            ffi::SAPI_ERR_PROBLEM_CANCELLED => SapiError::ProblemCanceled,
            ffi::SAPI_ERR_NO_INIT => SapiError::InitFailed(code),
            ffi::SAPI_ERR_OUT_OF_MEMORY => SapiError::OutOfMemory,
            other => SapiError::Sapi {
                code: other,
                message,
            },
        }
    }
}

impl From<SapiError> for SolverError {
    fn from(err: SapiError) -> Self {
        match err {
            SapiError::InvalidParameter(m) => SolverError::InvalidParameter(m),
            SapiError::SolveFailed(m) => SolverError::SolveFailed(m),
            SapiError::Authentication(m) => SolverError::Authentication(m),
            SapiError::Network(m) => SolverError::Network(m),
            SapiError::Communication(m) => SolverError::Communication(m),
            SapiError::AsyncNotDone(m) => SolverError::AsyncNotDone(m),
            SapiError::ProblemCanceled => SolverError::ProblemCanceled,
            SapiError::InitFailed(_) => SolverError::NotInitialized,
            SapiError::OutOfMemory => SolverError::OutOfMemory,
            SapiError::UnknownSolver(m) => SolverError::InvalidParameter(m),
            SapiError::Sapi { code, message } => SolverError::Backend { code, message },
            other => SolverError::Communication(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SapiError>;
