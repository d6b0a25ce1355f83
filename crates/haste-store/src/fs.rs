use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use haste_types::ProtoId;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// File extension for record files under the store root.
const RECORD_EXT: &str = "proto";

/// Filesystem-backed blob store: one `<identifier>.proto` file per record,
/// all in a single flat directory.
///
/// The identifier doubles as the file stem, which is why tags and uids are
/// restricted to filesystem-safe characters (see `haste_types::names`).
/// Foreign files in the root directory are ignored by [`BlobStore::list`].
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() && !root.is_dir() {
            return Err(StoreError::NotADirectory(root));
        }
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened blob store");
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &ProtoId) -> PathBuf {
        self.root.join(format!("{id}.{RECORD_EXT}"))
    }
}

impl BlobStore for FsBlobStore {
    fn read(&self, id: &ProtoId) -> StoreResult<Vec<u8>> {
        match fs::read(self.record_path(id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::RecordNotFound(id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, id: &ProtoId, bytes: &[u8]) -> StoreResult<()> {
        fs::write(self.record_path(id), bytes)?;
        debug!(record = %id, len = bytes.len(), "wrote record");
        Ok(())
    }

    fn exists(&self, id: &ProtoId) -> StoreResult<bool> {
        Ok(self.record_path(id).try_exists()?)
    }

    fn list(&self) -> StoreResult<Vec<ProtoId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.extension().map(|ext| ext == RECORD_EXT).unwrap_or(false) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match ProtoId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!("skipping foreign record file {:?}: {}", path, e);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl fmt::Debug for FsBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsBlobStore")
            .field("root", &self.root)
            .finish()
    }
}
