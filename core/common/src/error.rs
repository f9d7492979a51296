//! Common error types for Lockerbox.

use thiserror::Error;

/// Top-level error type for local Lockerbox operations.
///
/// Failures reported by the remote service are not represented here; they
/// travel through the API result contract instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A string-encoded record did not have the expected shape.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
