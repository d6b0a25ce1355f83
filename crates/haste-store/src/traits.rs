use haste_types::ProtoId;

use crate::error::StoreResult;

/// Identifier-keyed store of opaque serialized records.
///
/// All implementations must satisfy these invariants:
/// - A completed `write` is durable before the next `read` of the same
///   identifier from the same process.
/// - `read` of an absent identifier fails with `RecordNotFound`; it never
///   fabricates an empty record.
/// - `write` of an existing identifier overwrites the previous record.
/// - The store never interprets record contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Read the raw record for an identifier.
    fn read(&self, id: &ProtoId) -> StoreResult<Vec<u8>>;

    /// Write (or overwrite) the raw record for an identifier.
    fn write(&self, id: &ProtoId, bytes: &[u8]) -> StoreResult<()>;

    /// Check whether an identifier has a backing record.
    fn exists(&self, id: &ProtoId) -> StoreResult<bool>;

    /// Enumerate every identifier with a backing record, sorted.
    fn list(&self) -> StoreResult<Vec<ProtoId>>;
}
