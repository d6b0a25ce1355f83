//! Record transport format for the haste image.
//!
//! A Proto persists as a structured document with exactly four top-level
//! fields: `tag`, `uid`, `parents` (identifiers, in parent order), and
//! `slots` (slot name to encoded value). This crate owns that shape and the
//! value encoding rules:
//!
//! - A reference to another Proto encodes as the string
//!   `PROTOREF#:<identifier>`, carrying the full tag-qualified identifier so
//!   the token is unambiguous across tags.
//! - Sequences and mappings encode element-wise, recursively.
//! - Scalars pass through unchanged.
//!
//! The codec is purely structural: decoding a reference token yields the
//! referenced *identifier*, never a live object. Materializing referenced
//! Protos is the system image's job.
//!
//! [`RecordCodec`] is the byte-level boundary the image is constructed
//! with; [`JsonCodec`] is its JSON implementation, compact by default.

pub mod error;
pub mod json;
pub mod record;
pub mod traits;

pub use error::{CodecError, CodecResult};
pub use json::JsonCodec;
pub use record::{decode_value, encode_value, ProtoRecord, REF_PREFIX};
pub use traits::RecordCodec;
