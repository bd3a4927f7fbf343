//! Single-file key-value store.
//!
//! Persists keys as one JSON object in a file on disk, so the queue survives
//! a full application restart. Reads and writes are whole-file; the blob is
//! small (one queue snapshot) so this stays cheap.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::traits::{KeyValueStore, StorageError};

/// File-backed [`KeyValueStore`].
pub struct FileKv {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileKv {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| StorageError::Backend(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        let map = self.read_map()?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();

        // A corrupt file is overwritten rather than bricking every write
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable store file, starting fresh");
                HashMap::new()
            }
        };
        map.insert(key.to_string(), value.to_string());

        let raw = serde_json::to_string(&map).map_err(|e| StorageError::Backend(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| StorageError::Backend(e.to_string()))
    }
}
