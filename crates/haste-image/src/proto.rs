//! Prototype object handles.
//!
//! A [`Proto`] is a cheap-to-clone handle onto shared object state held
//! by the owning [`crate::SystemImage`]. All handles for one identifier
//! point at the same state, so a mutation through any handle is visible
//! through every other.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use indexmap::IndexMap;

use haste_codec::{CodecResult, ProtoRecord};
use haste_types::{ProtoId, Value};

use crate::error::{ImageError, ImageResult};
use crate::image::ImageInner;

/// Mutable object state behind a [`Proto`] handle.
#[derive(Debug, Default)]
pub(crate) struct ProtoState {
    pub(crate) parents: Vec<ProtoId>,
    pub(crate) slots: IndexMap<String, Value>,
}

/// A prototype object registered with a [`crate::SystemImage`].
///
/// Cloning a `Proto` clones the handle, not the object; use
/// [`Proto::clone_with`] to derive a new object. Behavior is defined by
/// slots alone. A slot read walks the object and then its parents in
/// list order, depth-first, and the first match wins.
#[derive(Clone)]
pub struct Proto {
    id: ProtoId,
    state: Arc<RwLock<ProtoState>>,
    image: Weak<ImageInner>,
}

impl Proto {
    pub(crate) fn from_parts(
        id: ProtoId,
        parents: Vec<ProtoId>,
        slots: IndexMap<String, Value>,
        image: Weak<ImageInner>,
    ) -> Self {
        Self {
            id,
            state: Arc::new(RwLock::new(ProtoState { parents, slots })),
            image,
        }
    }

    /// Replaces the state of a placeholder once its record is decoded.
    pub(crate) fn finalize(&self, parents: Vec<ProtoId>, slots: IndexMap<String, Value>) {
        let mut state = self.state.write().expect("lock poisoned");
        state.parents = parents;
        state.slots = slots;
    }

    /// Snapshots the object into its persistent record form.
    pub(crate) fn to_record(&self) -> CodecResult<ProtoRecord> {
        let state = self.state.read().expect("lock poisoned");
        ProtoRecord::new(
            &self.id,
            &state.parents,
            state.slots.iter().map(|(name, value)| (name.as_str(), value)),
        )
    }

    /// True when both handles share the same underlying state.
    pub(crate) fn same_instance(&self, other: &Proto) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn image(&self) -> ImageResult<Arc<ImageInner>> {
        self.image.upgrade().ok_or(ImageError::ImageDropped)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Full identifier of this object.
    pub fn id(&self) -> &ProtoId {
        &self.id
    }

    /// Tag component of the identifier.
    pub fn tag(&self) -> &str {
        self.id.tag()
    }

    /// Uid component of the identifier.
    pub fn uid(&self) -> &str {
        self.id.uid()
    }

    /// Identifiers of the direct parents, in precedence order.
    pub fn parents(&self) -> Vec<ProtoId> {
        self.state.read().expect("lock poisoned").parents.clone()
    }

    /// Snapshot of the object's own slots, in insertion order.
    pub fn slots(&self) -> Vec<(String, Value)> {
        let state = self.state.read().expect("lock poisoned");
        state
            .slots
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// True when the object itself defines `name`, ignoring parents.
    pub fn has_own_slot(&self, name: &str) -> bool {
        self.state
            .read()
            .expect("lock poisoned")
            .slots
            .contains_key(name)
    }

    // ------------------------------------------------------------------
    // Slot operations
    // ------------------------------------------------------------------

    /// Sets (or overwrites) an own slot and writes the object through to
    /// the store.
    ///
    /// If the write-through fails the slot is rolled back to its prior
    /// value, so memory and store never disagree. Returns `&self` so
    /// calls can be chained.
    pub fn set_slot(&self, name: &str, value: impl Into<Value>) -> ImageResult<&Proto> {
        let image = self.image()?;
        let prior = {
            let mut state = self.state.write().expect("lock poisoned");
            state.slots.insert(name.to_string(), value.into())
        };
        match image.put_proto(self) {
            Ok(()) => Ok(self),
            Err(err) => {
                let mut state = self.state.write().expect("lock poisoned");
                match prior {
                    Some(previous) => {
                        state.slots.insert(name.to_string(), previous);
                    }
                    None => {
                        state.slots.shift_remove(name);
                    }
                }
                Err(err)
            }
        }
    }

    /// Reads a slot, falling back through the parent chain.
    ///
    /// The object's own slots are consulted first, then each parent in
    /// list order, depth-first. The first object defining the slot wins.
    /// Objects already visited during the search are skipped, so cyclic
    /// graphs terminate. Fails with [`ImageError::SlotNotFound`] when the
    /// whole chain comes up empty.
    pub fn get_slot(&self, name: &str) -> ImageResult<Value> {
        let mut visited = HashSet::new();
        match self.lookup(name, &mut visited)? {
            Some(value) => Ok(value),
            None => Err(ImageError::SlotNotFound {
                slot: name.to_string(),
                proto: self.id.clone(),
            }),
        }
    }

    fn lookup(&self, name: &str, visited: &mut HashSet<ProtoId>) -> ImageResult<Option<Value>> {
        if !visited.insert(self.id.clone()) {
            return Ok(None);
        }
        let parents = {
            let state = self.state.read().expect("lock poisoned");
            if let Some(value) = state.slots.get(name) {
                return Ok(Some(value.clone()));
            }
            state.parents.clone()
        };
        let image = self.image()?;
        for parent_id in parents {
            let parent = image.get(&parent_id)?;
            if let Some(value) = parent.lookup(name, visited)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Derivation and matching
    // ------------------------------------------------------------------

    /// Derives a new object from this one.
    ///
    /// The clone gets a fresh uid, this object's parent list with this
    /// object appended, and a copy of this object's own slots overlaid
    /// with `overrides`. `tag` defaults to this object's tag. The clone
    /// is registered and persisted before it is returned; afterwards the
    /// two objects evolve independently.
    pub fn clone_with(&self, tag: Option<&str>, overrides: &[(&str, Value)]) -> ImageResult<Proto> {
        let image = self.image()?;
        let id = ProtoId::generate(tag.unwrap_or_else(|| self.id.tag()))?;
        let (mut parents, mut slots) = {
            let state = self.state.read().expect("lock poisoned");
            (state.parents.clone(), state.slots.clone())
        };
        parents.push(self.id.clone());
        for (name, value) in overrides {
            slots.insert((*name).to_string(), value.clone());
        }
        image.create_proto(id, parents, slots)
    }

    /// True when every `(slot, value)` pair in `query` resolves through
    /// this object to an equal value.
    ///
    /// A slot missing from the whole chain makes the object a non-match
    /// rather than an error, so mixed populations can be queried.
    pub fn matches(&self, query: &[(&str, Value)]) -> ImageResult<bool> {
        for (name, expected) in query {
            match self.get_slot(name) {
                Ok(actual) => {
                    if actual != *expected {
                        return Ok(false);
                    }
                }
                Err(ImageError::SlotNotFound { .. }) => return Ok(false),
                Err(err) => return Err(err),
            }
        }
        Ok(true)
    }
}

/// Handles are equal when they name the same object.
impl PartialEq for Proto {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Proto {}

impl fmt::Debug for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proto").field("id", &self.id).finish()
    }
}

/// Renders the object as `( Tag < Parent1 Parent2 | name=value ... )`.
impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        write!(f, "( {}", self.id.tag())?;
        if !state.parents.is_empty() {
            write!(f, " <")?;
            for parent in &state.parents {
                write!(f, " {}", parent.tag())?;
            }
        }
        write!(f, " |")?;
        for (name, value) in &state.slots {
            write!(f, " {name}={value}")?;
        }
        write!(f, " )")
    }
}

#[cfg(test)]
mod tests {
    use haste_codec::JsonCodec;
    use haste_store::MemoryBlobStore;
    use haste_types::Value;

    use crate::error::ImageError;
    use crate::image::SystemImage;

    fn memory_image() -> SystemImage {
        SystemImage::new(
            Box::new(MemoryBlobStore::new()),
            Box::new(JsonCodec::new()),
        )
        .expect("image construction")
    }

    #[test]
    fn set_slot_is_chainable_and_visible_through_every_handle() {
        let image = memory_image();
        let thing = image.create("Thing").unwrap();
        thing
            .set_slot("a", 1)
            .unwrap()
            .set_slot("b", "two")
            .unwrap();

        let again = image.get(thing.id()).unwrap();
        assert_eq!(again.get_slot("a").unwrap(), Value::Int(1));
        assert_eq!(again.get_slot("b").unwrap(), Value::Str("two".into()));
    }

    #[test]
    fn get_slot_prefers_own_slot_over_parents() {
        let image = memory_image();
        let base = image
            .create_with_slots("Shape", &[("sides", Value::Int(0))])
            .unwrap();
        let square = base.clone_with(None, &[("sides", Value::Int(4))]).unwrap();

        assert_eq!(square.get_slot("sides").unwrap(), Value::Int(4));
        assert_eq!(base.get_slot("sides").unwrap(), Value::Int(0));
    }

    #[test]
    fn get_slot_falls_back_to_parent_added_after_cloning() {
        let image = memory_image();
        let base = image.create("Config").unwrap();
        let derived = base.clone_with(None, &[]).unwrap();

        // The slot appears on the parent only after the clone was taken,
        // so the clone must reach it through delegation.
        base.set_slot("verbose", true).unwrap();
        assert!(!derived.has_own_slot("verbose"));
        assert_eq!(derived.get_slot("verbose").unwrap(), Value::Bool(true));
    }

    #[test]
    fn get_slot_missing_everywhere_is_slot_not_found() {
        let image = memory_image();
        let thing = image.create("Thing").unwrap();
        let err = thing.get_slot("absent").unwrap_err();
        match err {
            ImageError::SlotNotFound { slot, proto } => {
                assert_eq!(slot, "absent");
                assert_eq!(&proto, thing.id());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn clone_with_derives_tag_uid_parents_and_slots() {
        let image = memory_image();
        let book = image
            .create_with_slots("Book", &[("title", Value::Null)])
            .unwrap();
        let novel = book
            .clone_with(Some("Novel"), &[("title", "Demian".into())])
            .unwrap();

        assert_eq!(novel.tag(), "Novel");
        assert_ne!(novel.uid(), book.uid());
        assert_eq!(novel.parents(), vec![book.id().clone()]);
        assert_eq!(novel.get_slot("title").unwrap(), Value::Str("Demian".into()));
        // The prototype keeps its own slot untouched.
        assert_eq!(book.get_slot("title").unwrap(), Value::Null);
    }

    #[test]
    fn clones_evolve_independently() {
        let image = memory_image();
        let original = image
            .create_with_slots("Doc", &[("body", "draft".into())])
            .unwrap();
        let copy = original.clone_with(None, &[]).unwrap();

        copy.set_slot("body", "edited").unwrap();
        assert_eq!(original.get_slot("body").unwrap(), Value::Str("draft".into()));
        assert_eq!(copy.get_slot("body").unwrap(), Value::Str("edited".into()));
    }

    #[test]
    fn matches_compares_resolved_slots() {
        let image = memory_image();
        let book = image
            .create_with_slots(
                "Book",
                &[("title", "Mindstorms".into()), ("year", Value::Int(1980))],
            )
            .unwrap();

        assert!(book.matches(&[("title", "Mindstorms".into())]).unwrap());
        assert!(book
            .matches(&[("title", "Mindstorms".into()), ("year", Value::Int(1980))])
            .unwrap());
        assert!(!book.matches(&[("title", "Emile".into())]).unwrap());
        // A missing slot is a non-match, not an error.
        assert!(!book.matches(&[("isbn", Value::Null)]).unwrap());
        // The empty query matches everything.
        assert!(book.matches(&[]).unwrap());
    }

    #[test]
    fn matches_sees_inherited_slots() {
        let image = memory_image();
        let base = image
            .create_with_slots("Species", &[("kingdom", "animalia".into())])
            .unwrap();
        let wolf = base.clone_with(None, &[]).unwrap();
        base.set_slot("extinct", false).unwrap();

        assert!(wolf.matches(&[("extinct", false.into())]).unwrap());
    }

    #[test]
    fn handle_equality_follows_identifier() {
        let image = memory_image();
        let a = image.create("Thing").unwrap();
        let b = image.create("Thing").unwrap();

        assert_eq!(a, image.get(a.id()).unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn display_shows_tag_parents_and_slots() {
        let image = memory_image();
        let object = image.object().unwrap();
        let book = object
            .clone_with(Some("Book"), &[("title", "Mindstorms".into())])
            .unwrap();

        assert_eq!(book.to_string(), "( Book < Object | title=Mindstorms )");
        assert_eq!(image.object().unwrap().to_string(), "( Object | )");
    }

    #[test]
    fn operations_after_image_drop_report_image_dropped() {
        let image = memory_image();
        let thing = image.create("Thing").unwrap();
        drop(image);

        assert!(matches!(
            thing.set_slot("a", 1).unwrap_err(),
            ImageError::ImageDropped
        ));
        assert!(matches!(
            thing.clone_with(None, &[]).unwrap_err(),
            ImageError::ImageDropped
        ));
    }

    #[test]
    fn invalid_clone_tag_is_rejected() {
        let image = memory_image();
        let thing = image.create("Thing").unwrap();
        let err = thing.clone_with(Some("bad-tag"), &[]).unwrap_err();
        assert!(matches!(err, ImageError::Type(_)));
        // Nothing was registered under the rejected tag.
        assert!(image.find_all("bad-tag").is_empty());
    }

    #[test]
    fn ref_slots_share_their_target() {
        let image = memory_image();
        let author = image
            .create_with_slots("Person", &[("name", "Papert".into())])
            .unwrap();
        let book = image
            .create_with_slots("Book", &[("author", author.id().into())])
            .unwrap();
        let reissue = book.clone_with(None, &[]).unwrap();

        // Both books point at the one author object.
        author.set_slot("name", "Seymour Papert").unwrap();
        let resolved = match reissue.get_slot("author").unwrap() {
            Value::Ref(id) => image.get(&id).unwrap(),
            other => panic!("unexpected value: {other:?}"),
        };
        assert_eq!(
            resolved.get_slot("name").unwrap(),
            Value::Str("Seymour Papert".into())
        );
    }

    #[test]
    fn slot_snapshot_preserves_insertion_order() {
        let image = memory_image();
        let thing = image.create("Thing").unwrap();
        thing.set_slot("zeta", 1).unwrap();
        thing.set_slot("alpha", 2).unwrap();
        thing.set_slot("zeta", 3).unwrap();

        let names: Vec<String> = thing.slots().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta".to_string(), "alpha".to_string()]);
    }
}
