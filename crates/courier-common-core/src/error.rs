//! Error types for Courier core codecs.

use thiserror::Error;

/// The error type for core codec operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Text did not match any supported timestamp representation.
    #[error("unrecognized timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// A zone offset could not be parsed.
    #[error("invalid zone offset: {0:?}")]
    InvalidOffset(String),
}

impl Error {
    /// Create a new timestamp error.
    pub fn timestamp(text: impl Into<String>) -> Self {
        Self::InvalidTimestamp(text.into())
    }
}

/// Result type alias using Courier's core Error.
pub type Result<T> = std::result::Result<T, Error>;
