use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use haste_types::ProtoId;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. All records are held in memory behind a
/// `RwLock`; records are cloned on read.
#[derive(Default)]
pub struct MemoryBlobStore {
    records: RwLock<HashMap<ProtoId, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }

    /// Remove all records from the store.
    pub fn clear(&self) {
        self.records.write().expect("lock poisoned").clear();
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, id: &ProtoId) -> StoreResult<Vec<u8>> {
        let map = self.records.read().expect("lock poisoned");
        map.get(id)
            .cloned()
            .ok_or_else(|| StoreError::RecordNotFound(id.clone()))
    }

    fn write(&self, id: &ProtoId, bytes: &[u8]) -> StoreResult<()> {
        let mut map = self.records.write().expect("lock poisoned");
        map.insert(id.clone(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, id: &ProtoId) -> StoreResult<bool> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn list(&self) -> StoreResult<Vec<ProtoId>> {
        let map = self.records.read().expect("lock poisoned");
        let mut ids: Vec<ProtoId> = map.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

impl fmt::Debug for MemoryBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlobStore")
            .field("record_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(tag: &str, uid: &str) -> ProtoId {
        ProtoId::new(tag, uid).unwrap()
    }

    #[test]
    fn write_then_read_roundtrip() {
        let store = MemoryBlobStore::new();
        let record = id("Book", "1");
        store.write(&record, b"payload").unwrap();
        assert_eq!(store.read(&record).unwrap(), b"payload");
    }

    #[test]
    fn write_overwrites_previous_record() {
        let store = MemoryBlobStore::new();
        let record = id("Book", "1");
        store.write(&record, b"old").unwrap();
        store.write(&record, b"new").unwrap();
        assert_eq!(store.read(&record).unwrap(), b"new");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn read_missing_record_fails() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.read(&id("Book", "1")),
            Err(StoreError::RecordNotFound(_))
        ));
    }

    #[test]
    fn exists_reflects_writes() {
        let store = MemoryBlobStore::new();
        let record = id("Pet", "7");
        assert!(!store.exists(&record).unwrap());
        store.write(&record, b"{}").unwrap();
        assert!(store.exists(&record).unwrap());
    }

    #[test]
    fn list_returns_sorted_identifiers() {
        let store = MemoryBlobStore::new();
        store.write(&id("Pet", "2"), b"{}").unwrap();
        store.write(&id("Book", "1"), b"{}").unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed, vec![id("Book", "1"), id("Pet", "2")]);
    }

    #[test]
    fn clear_empties_the_store() {
        let store = MemoryBlobStore::new();
        store.write(&id("Book", "1"), b"{}").unwrap();
        assert!(!store.is_empty());
        store.clear();
        assert!(store.is_empty());
    }
}
