//! Durable record storage for the haste image.
//!
//! This crate implements the blob layer of the persistence image: one opaque
//! serialized record per object, keyed by the object's identifier. The store
//! never interprets record contents — encoding and decoding belong to the
//! codec layer above it.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`FsBlobStore`] — one `<identifier>.proto` file per record under a root
//!   directory
//! - [`MemoryBlobStore`] — `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. A completed write is durable before the next read of the same
//!    identifier from the same process. Nothing more is promised about
//!    partial writes.
//! 2. Reads of absent identifiers fail with [`StoreError::RecordNotFound`],
//!    never an empty record.
//! 3. The store never interprets record contents — it is a pure key-value
//!    store.
//! 4. There is no delete operation: removing a record is an administrative
//!    action on the backing medium, outside the model.
//! 5. Concurrent external mutation of the backing medium is out of scope.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use traits::BlobStore;
