use std::path::PathBuf;

use haste_types::ProtoId;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested identifier has no backing record.
    #[error("no record for {0}")]
    RecordNotFound(ProtoId),

    /// The store root exists but is not a directory.
    #[error("store root {0} is not a directory")]
    NotADirectory(PathBuf),

    /// I/O error from the underlying medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
