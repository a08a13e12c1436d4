//! Common error types for Hibikidō

use thiserror::Error;

/// Common result type for Hibikidō operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by Hibikidō crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Spectral signature failed validation (length, finiteness, sign)
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}
