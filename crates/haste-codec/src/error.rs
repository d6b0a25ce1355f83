use thiserror::Error;

/// Errors from record encoding and decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The record bytes or an embedded value do not match the expected shape.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// The in-memory shape could not be serialized.
    #[error("record encoding failed: {0}")]
    Encode(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
