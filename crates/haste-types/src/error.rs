use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid tag `{tag}`: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("invalid identifier `{input}`: {reason}")]
    InvalidIdentifier { input: String, reason: String },
}
