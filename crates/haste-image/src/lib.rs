//! The haste system image: live prototype objects over durable records.
//!
//! This is the crate applications embed. A [`SystemImage`] owns a blob
//! store and a record codec and hands out [`Proto`] handles; everything
//! else follows from four rules:
//!
//! - Objects have no classes. New objects are made by cloning an existing
//!   one ([`Proto::clone_with`]), and behavior lives entirely in slots.
//! - A slot read ([`Proto::get_slot`]) falls back through the parent
//!   chain, first match wins.
//! - Every mutation writes through to the store before returning. There
//!   is no save step and no dirty state.
//! - One live instance exists per identifier; loading a stored graph
//!   ([`SystemImage::restore`]) rebuilds shared structure and reference
//!   cycles exactly.

pub mod error;
pub mod image;
pub mod proto;

pub use error::{ImageError, ImageResult};
pub use image::SystemImage;
pub use proto::Proto;

// Re-export key types
pub use haste_codec::{JsonCodec, ProtoRecord, RecordCodec};
pub use haste_store::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use haste_types::{ProtoId, TypeError, Value};
