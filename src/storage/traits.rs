use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Local durable key-value storage.
///
/// The pending-operation queue is persisted as one encoded blob under a fixed
/// key, so implementations only need string get/set. An implementation must
/// survive a full process restart to be useful as queue backing; the
/// in-memory variant exists for tests and ephemeral embedders.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
