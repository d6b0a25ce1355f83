//! Error types for image and prototype operations.

use haste_codec::CodecError;
use haste_store::StoreError;
use haste_types::{ProtoId, TypeError};
use thiserror::Error;

/// Errors surfaced by [`crate::SystemImage`] and [`crate::Proto`].
#[derive(Debug, Error)]
pub enum ImageError {
    /// A slot lookup exhausted the object and its whole parent chain.
    #[error("no slot `{slot}` on {proto} or its parents")]
    SlotNotFound { slot: String, proto: ProtoId },

    /// A referenced object has no record in the backing store.
    #[error("no record for {0}")]
    RecordNotFound(ProtoId),

    /// A parent chain in the stored graph loops back on itself.
    #[error("parent chain cycles through {0}")]
    CycleDetected(ProtoId),

    /// A stored record could not be decoded.
    #[error("record decode failed: {0}")]
    Decode(#[from] CodecError),

    /// An object could not be encoded for writing.
    #[error("record encoding failed: {0}")]
    Encode(CodecError),

    /// The write-through for an object failed; the in-memory image
    /// was left as it was before the operation.
    #[error("write-through of {id} failed: {source}")]
    StoreWrite {
        id: ProtoId,
        #[source]
        source: StoreError,
    },

    /// A store operation other than a write-through failed.
    #[error("store failure: {0}")]
    Store(#[source] StoreError),

    /// Invalid tag or identifier input.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The object handle outlived the image it belongs to.
    #[error("system image was dropped while object handles were still live")]
    ImageDropped,
}

/// Convenience alias for image operations.
pub type ImageResult<T> = Result<T, ImageError>;
