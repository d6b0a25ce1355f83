use crate::error::{CodecError, CodecResult};
use crate::record::ProtoRecord;
use crate::traits::RecordCodec;

/// JSON codec for record bodies.
///
/// Compact output by default; [`JsonCodec::pretty`] produces indented
/// records for stores meant to be read by humans. Both forms decode
/// identically.
#[derive(Clone, Debug, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Codec producing compact record bodies.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Codec producing indented record bodies.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl RecordCodec for JsonCodec {
    fn encode(&self, record: &ProtoRecord) -> CodecResult<Vec<u8>> {
        let out = if self.pretty {
            serde_json::to_vec_pretty(record)
        } else {
            serde_json::to_vec(record)
        };
        out.map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<ProtoRecord> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))
    }
}
