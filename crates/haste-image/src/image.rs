//! The system image: identity map, write-through persistence, and restore.
//!
//! [`SystemImage`] owns the injected blob store and record codec and keeps
//! the identity map of live objects. Every object operation that mutates
//! state writes through the image before returning, and every lookup by
//! identifier goes through the image, so at most one live instance exists
//! per identifier.
//!
//! # Invariants
//!
//! - One live instance per identifier: repeated [`SystemImage::get`] calls
//!   return handles onto the same shared state.
//! - A record is registered in the identity map only after it was written
//!   to the store, so the map never holds objects the store does not.
//! - Loading a record registers a placeholder before resolving the
//!   identifiers it references, so reference cycles between records
//!   terminate instead of re-entering the load.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, Weak};

use indexmap::IndexMap;
use tracing::{debug, info};

use haste_codec::{CodecError, JsonCodec, RecordCodec};
use haste_store::{BlobStore, FsBlobStore, StoreError};
use haste_types::{ProtoId, Value};

use crate::error::{ImageError, ImageResult};
use crate::proto::Proto;

/// One identity-map entry.
///
/// `Loading` is the in-progress state of a record whose referenced
/// identifiers are still being resolved; reentrant lookups during that
/// window get the placeholder back. Entries observable outside a single
/// image operation are always `Live`.
enum Entry {
    Loading(Proto),
    Live(Proto),
}

impl Entry {
    fn proto(&self) -> &Proto {
        match self {
            Entry::Loading(proto) | Entry::Live(proto) => proto,
        }
    }

    fn is_loading(&self) -> bool {
        matches!(self, Entry::Loading(_))
    }
}

#[derive(Default)]
struct ImageState {
    live: HashMap<ProtoId, Entry>,
}

/// Shared internals behind a [`SystemImage`].
///
/// `Proto` handles hold a weak reference here, which is how a mutation on
/// any handle reaches the store without the handle owning the image. All
/// map access and the write path run under one mutex, scoped to a whole
/// operation; recursive loading threads the guarded state through internal
/// calls instead of re-locking.
pub(crate) struct ImageInner {
    weak_self: Weak<ImageInner>,
    store: Box<dyn BlobStore>,
    codec: Box<dyn RecordCodec>,
    state: Mutex<ImageState>,
}

impl ImageInner {
    fn handle(&self, id: ProtoId, parents: Vec<ProtoId>, slots: IndexMap<String, Value>) -> Proto {
        Proto::from_parts(id, parents, slots, self.weak_self.clone())
    }

    /// Registers `proto` and writes its record through to the store.
    ///
    /// The store write happens first: if it fails, nothing is registered
    /// and the error reports which object could not be written.
    pub(crate) fn put_proto(&self, proto: &Proto) -> ImageResult<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        let record = proto.to_record().map_err(ImageError::Encode)?;
        let bytes = self.codec.encode(&record).map_err(ImageError::Encode)?;
        self.store
            .write(proto.id(), &bytes)
            .map_err(|source| ImageError::StoreWrite {
                id: proto.id().clone(),
                source,
            })?;
        state
            .live
            .insert(proto.id().clone(), Entry::Live(proto.clone()));
        debug!(object = %proto.id(), "persisted object");
        Ok(())
    }

    /// Builds a fresh object handle, then persists and registers it.
    pub(crate) fn create_proto(
        &self,
        id: ProtoId,
        parents: Vec<ProtoId>,
        slots: IndexMap<String, Value>,
    ) -> ImageResult<Proto> {
        let proto = self.handle(id, parents, slots);
        self.put_proto(&proto)?;
        Ok(proto)
    }

    /// Returns the live instance for `id`, loading it from the store on a
    /// miss.
    pub(crate) fn get(&self, id: &ProtoId) -> ImageResult<Proto> {
        let mut state = self.state.lock().expect("lock poisoned");
        let mut trail = Vec::new();
        self.get_locked(&mut state, id, &mut trail)
    }

    /// Map-or-load under the image lock.
    ///
    /// `trail` is the chain of identifiers currently being loaded along
    /// consecutive parent edges. A hit on an in-progress entry that is
    /// also on the trail means the stored parent chain loops back on
    /// itself, which is invalid data; an in-progress hit off the trail is
    /// a reference cycle and resolves to the placeholder.
    fn get_locked(
        &self,
        state: &mut ImageState,
        id: &ProtoId,
        trail: &mut Vec<ProtoId>,
    ) -> ImageResult<Proto> {
        if let Some(entry) = state.live.get(id) {
            if entry.is_loading() && trail.contains(id) {
                return Err(ImageError::CycleDetected(id.clone()));
            }
            return Ok(entry.proto().clone());
        }
        self.load_locked(state, id, trail)
    }

    /// Reads and decodes one record, recursively materializing every
    /// identifier it references.
    ///
    /// The placeholder is registered before recursion and finalized after
    /// it; a failed load deregisters the placeholder so the map never
    /// retains a half-loaded object.
    fn load_locked(
        &self,
        state: &mut ImageState,
        id: &ProtoId,
        trail: &mut Vec<ProtoId>,
    ) -> ImageResult<Proto> {
        let bytes = match self.store.read(id) {
            Ok(bytes) => bytes,
            Err(StoreError::RecordNotFound(_)) => {
                return Err(ImageError::RecordNotFound(id.clone()))
            }
            Err(e) => return Err(ImageError::Store(e)),
        };
        let record = self.codec.decode(&bytes)?;
        let record_id = record.identifier()?;
        if record_id != *id {
            return Err(ImageError::Decode(CodecError::Malformed(format!(
                "record for {id} names itself {record_id}"
            ))));
        }
        let parents = record.parent_ids()?;
        let slots = record.decode_slots()?;

        let placeholder = self.handle(id.clone(), Vec::new(), IndexMap::new());
        state
            .live
            .insert(id.clone(), Entry::Loading(placeholder.clone()));
        trail.push(id.clone());
        let resolved = self.resolve_edges(state, &parents, &slots, trail);
        trail.pop();

        match resolved {
            Ok(()) => {
                placeholder.finalize(parents, slots);
                state
                    .live
                    .insert(id.clone(), Entry::Live(placeholder.clone()));
                debug!(object = %id, "loaded object");
                Ok(placeholder)
            }
            Err(e) => {
                state.live.remove(id);
                Err(e)
            }
        }
    }

    fn resolve_edges(
        &self,
        state: &mut ImageState,
        parents: &[ProtoId],
        slots: &IndexMap<String, Value>,
        trail: &mut Vec<ProtoId>,
    ) -> ImageResult<()> {
        for parent in parents {
            self.get_locked(state, parent, trail)?;
        }
        // A reference edge is not a parent edge: objects reached through
        // slot values start their own parent trail.
        let mut ref_trail = Vec::new();
        for value in slots.values() {
            self.materialize_value(state, value, &mut ref_trail)?;
        }
        Ok(())
    }

    fn materialize_value(
        &self,
        state: &mut ImageState,
        value: &Value,
        trail: &mut Vec<ProtoId>,
    ) -> ImageResult<()> {
        match value {
            Value::Ref(target) => {
                self.get_locked(state, target, trail)?;
            }
            Value::Seq(items) => {
                for item in items {
                    self.materialize_value(state, item, trail)?;
                }
            }
            Value::Map(entries) => {
                for entry in entries.values() {
                    self.materialize_value(state, entry, trail)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// A prototype-object image over a blob store.
///
/// The image is the explicit context every object operation runs against:
/// it owns the identity map of live objects, the store, and the codec, and
/// it guarantees the well-known root object `Object-1` exists. Objects are
/// durable from the moment they are created; there is no save operation
/// and no unsaved state.
///
/// Dropping the image invalidates all outstanding [`Proto`] handles: their
/// operations fail with [`ImageError::ImageDropped`] rather than touching
/// a store that no longer has an owner.
pub struct SystemImage {
    inner: Arc<ImageInner>,
}

impl SystemImage {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Builds an image over the injected store and codec.
    ///
    /// Ensures the root object exists: if neither the identity map nor
    /// the store knows `Object-1`, it is created and persisted. An
    /// existing root record is left untouched.
    pub fn new(store: Box<dyn BlobStore>, codec: Box<dyn RecordCodec>) -> ImageResult<Self> {
        let inner = Arc::new_cyclic(|weak| ImageInner {
            weak_self: weak.clone(),
            store,
            codec,
            state: Mutex::new(ImageState::default()),
        });
        let image = Self { inner };
        image.ensure_root()?;
        Ok(image)
    }

    /// Opens an image over a filesystem store rooted at `root`, with the
    /// compact JSON codec.
    pub fn open(root: impl AsRef<Path>) -> ImageResult<Self> {
        let store = FsBlobStore::open(root).map_err(ImageError::Store)?;
        Self::new(Box::new(store), Box::new(JsonCodec::new()))
    }

    /// Opens an image at `root` and materializes every persisted record.
    pub fn bootstrap(root: impl AsRef<Path>) -> ImageResult<Self> {
        let image = Self::open(root)?;
        image.restore()?;
        Ok(image)
    }

    fn ensure_root(&self) -> ImageResult<()> {
        let root = ProtoId::root();
        if self.contains(&root) {
            return Ok(());
        }
        if self.inner.store.exists(&root).map_err(ImageError::Store)? {
            return Ok(());
        }
        self.inner
            .create_proto(root, Vec::new(), IndexMap::new())?;
        debug!("created root object");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Object lifecycle
    // ------------------------------------------------------------------

    /// The well-known root object every store carries.
    pub fn object(&self) -> ImageResult<Proto> {
        self.get(&ProtoId::root())
    }

    /// Creates a new object with no parents and no slots.
    pub fn create(&self, tag: &str) -> ImageResult<Proto> {
        self.create_with_slots(tag, &[])
    }

    /// Creates a new object with no parents and the given initial slots.
    ///
    /// The object is persisted before it is returned.
    pub fn create_with_slots(&self, tag: &str, slots: &[(&str, Value)]) -> ImageResult<Proto> {
        let id = ProtoId::generate(tag)?;
        let slots: IndexMap<String, Value> = slots
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect();
        self.inner.create_proto(id, Vec::new(), slots)
    }

    /// Registers `proto` under its identifier and writes it through to
    /// the store.
    ///
    /// Re-putting an identifier overwrites the previous record. A failed
    /// store write registers nothing.
    pub fn put(&self, proto: &Proto) -> ImageResult<()> {
        self.inner.put_proto(proto)
    }

    /// Returns the live instance for `id`.
    ///
    /// A hit returns the cached instance. A miss reads the record from
    /// the store, decodes it, and recursively loads every identifier it
    /// references (parents and reference-valued slots), so the returned
    /// object's whole reachable graph is live. Fails with
    /// [`ImageError::RecordNotFound`] when the store has no record, and
    /// with [`ImageError::CycleDetected`] when a stored parent chain
    /// loops back on itself.
    pub fn get(&self, id: &ProtoId) -> ImageResult<Proto> {
        self.inner.get(id)
    }

    /// Materializes every record in the store into the identity map.
    ///
    /// Loading is idempotent, so the enumeration order of the store does
    /// not matter and a repeated restore is a no-op. Returns the number
    /// of live objects.
    pub fn restore(&self) -> ImageResult<usize> {
        let ids = self.inner.store.list().map_err(ImageError::Store)?;
        for id in &ids {
            self.inner.get(id)?;
        }
        let live = self.len();
        info!(records = ids.len(), live, "restored image");
        Ok(live)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All live objects whose tag equals `tag`, sorted by identifier.
    ///
    /// Only objects already in the identity map are considered; call
    /// [`SystemImage::restore`] first to query the full persisted
    /// population.
    pub fn find_all(&self, tag: &str) -> Vec<Proto> {
        let mut found: Vec<Proto> = {
            let state = self.inner.state.lock().expect("lock poisoned");
            state
                .live
                .iter()
                .filter(|(id, _)| id.tag() == tag)
                .map(|(_, entry)| entry.proto().clone())
                .collect()
        };
        found.sort_by(|a, b| a.id().cmp(b.id()));
        found
    }

    /// [`SystemImage::find_all`] filtered by [`Proto::matches`].
    pub fn find_with_slots(&self, tag: &str, query: &[(&str, Value)]) -> ImageResult<Vec<Proto>> {
        let mut found = Vec::new();
        for proto in self.find_all(tag) {
            if proto.matches(query)? {
                found.push(proto);
            }
        }
        Ok(found)
    }

    /// First live object of `tag` matching `query`, or `None`.
    pub fn find_one(&self, tag: &str, query: &[(&str, Value)]) -> ImageResult<Option<Proto>> {
        for proto in self.find_all(tag) {
            if proto.matches(query)? {
                return Ok(Some(proto));
            }
        }
        Ok(None)
    }

    /// Number of live objects in the identity map.
    pub fn len(&self) -> usize {
        self.inner.state.lock().expect("lock poisoned").live.len()
    }

    /// Returns `true` if no objects are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `id` has a live instance.
    pub fn contains(&self, id: &ProtoId) -> bool {
        self.inner
            .state
            .lock()
            .expect("lock poisoned")
            .live
            .contains_key(id)
    }
}

impl fmt::Debug for SystemImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemImage")
            .field("live_count", &self.len())
            .finish()
    }
}
