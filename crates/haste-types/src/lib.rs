//! Foundation types for the haste prototype-object image.
//!
//! This crate provides the identifier and value primitives used throughout
//! the haste system. Every other haste crate depends on `haste-types`.
//!
//! # Key Types
//!
//! - [`ProtoId`] — Canonical `tag-uid` identifier naming a Proto and its
//!   persisted record
//! - [`Value`] — Closed union of everything a slot can hold: scalars,
//!   sequences, mappings, and references to other Protos
//! - [`TypeError`] — Validation and parse failures
//!
//! Tags and uids are validated in [`names`] because an identifier doubles
//! as the file stem of its record in a filesystem-backed store.

pub mod error;
pub mod id;
pub mod names;
pub mod value;

pub use error::TypeError;
pub use id::{ProtoId, ROOT_TAG, ROOT_UID};
pub use names::{validate_tag, validate_uid, IDENTIFIER_SEPARATOR};
pub use value::Value;
