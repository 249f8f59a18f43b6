//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Backing-store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// A rule or VIP pattern failed to compile.
    #[error("Invalid pattern in {rule}: {source}")]
    Pattern {
        /// Name of the rule or VIP entry carrying the pattern.
        rule: String,
        /// The underlying regex error.
        source: regex::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A retryable store operation kept failing past the retry ceiling.
    #[error("{operation} failed after {attempts} attempts due to rate limits")]
    RetriesExhausted {
        /// Description of the operation that was retried.
        operation: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
