use crate::error::CodecResult;
use crate::record::ProtoRecord;

/// Byte-level boundary between records and the blob store.
///
/// Implementations must be inverse pairs: `decode(encode(r))` reproduces an
/// equivalent record, slot order included. The system image is constructed
/// with a boxed codec, so alternative body formats can be injected without
/// touching the image.
pub trait RecordCodec: Send + Sync {
    /// Serialize a record into its stored byte form.
    fn encode(&self, record: &ProtoRecord) -> CodecResult<Vec<u8>>;

    /// Parse stored bytes back into a record.
    fn decode(&self, bytes: &[u8]) -> CodecResult<ProtoRecord>;
}
