//! Error types for hbk-orchestrator
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for hbk-orchestrator
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared library (signature validation, config)
    #[error(transparent)]
    Common(#[from] hbk_common::Error),

    /// Catalog file could not be parsed
    #[error("Catalog error: {0}")]
    Catalog(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Orchestrator state is unusable (poisoned lock)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience Result type using hbk-orchestrator Error
pub type Result<T> = std::result::Result<T, Error>;
