//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building or decoding protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// JSON could not be parsed or produced.
    #[error("json error: {0}")]
    Json(String),

    /// JSON was well-formed but did not have the expected shape.
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// A record has no usable identifier.
    #[error("record is missing identifier field `{field}`")]
    MissingId {
        /// Name of the identifier field.
        field: String,
    },

    /// A range is empty or inverted.
    #[error("invalid range [{start}, {end})")]
    InvalidRange {
        /// Range start (inclusive).
        start: u64,
        /// Range end (exclusive).
        end: u64,
    },

    /// Advancing a range would overflow the offset space.
    #[error("range overflow advancing [{start}, {end})")]
    RangeOverflow {
        /// Range start (inclusive).
        start: u64,
        /// Range end (exclusive).
        end: u64,
    },
}

impl ProtocolError {
    /// Creates an invalid-structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
