//! Error types for the sortbox framework.
//!
//! [`SortboxError`] covers failures that are not specific to one subsystem:
//! configuration loading and the I/O and JSON errors that come with it.
//! Subsystems (LLM providers, stores, the pipeline) define their own
//! error enums and convert into this one at the binary boundary.

use thiserror::Error;

/// Top-level error type for sortbox.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SortboxError {
    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A mailbox fixture or other input file could not be understood.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What is wrong with the input.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience type alias for sortbox operations.
pub type Result<T> = std::result::Result<T, SortboxError>;
