use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::traits::{KeyValueStore, StorageError};

/// In-memory key-value store.
///
/// Not durable; intended for tests and embedders that accept losing the
/// queue on restart. Writes can be made to fail on demand to exercise the
/// persistence-unavailable path.
pub struct InMemoryKv {
    data: DashMap<String, String>,
    fail_writes: AtomicBool,
}

impl InMemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Get current key count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear all keys
    pub fn clear(&self) {
        self.data.clear();
    }

    /// Make subsequent `set` calls fail, simulating unavailable storage.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(StorageError::Backend("write disabled".to_string()));
        }
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
