//! Durable FIFO log of deferred mutations.
//!
//! The queue is persisted outside process memory as a single versioned JSON
//! blob under a well-known key, so it survives a full application restart.
//! Entries are processed in strict enqueue order for the whole queue; an
//! entry exists from successful append until either a successful replay or a
//! classified-permanent replay failure removes it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::OfflineSyncConfig;
use crate::operation::{Mutation, PendingOperation};
use crate::storage::traits::{KeyValueStore, StorageError};

/// Version tag written into every persisted snapshot. Blobs with an unknown
/// version are discarded on read rather than misinterpreted.
const QUEUE_SCHEMA_VERSION: u32 = 1;

/// Persisted queue encoding.
#[derive(Debug, Serialize, Deserialize)]
struct QueueSnapshot {
    version: u32,
    ops: Vec<PendingOperation>,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("queue full: {len} entries (max {max})")]
    Full { len: usize, max: usize },
    #[error("queue encoding failed: {0}")]
    Encoding(String),
}

/// Lifetime counters for observability
#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub total_appended: u64,
    pub total_removed: u64,
}

/// Durable FIFO pending-operation store.
pub struct PendingQueue {
    store: Arc<dyn KeyValueStore>,
    key: String,
    max_entries: usize,
    /// Serializes read-modify-write cycles across interleaved tasks
    write_lock: Mutex<()>,
    total_appended: AtomicU64,
    total_removed: AtomicU64,
}

impl PendingQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &OfflineSyncConfig) -> Self {
        Self {
            store,
            key: config.queue_key.clone(),
            max_entries: config.queue_max_entries,
            write_lock: Mutex::new(()),
            total_appended: AtomicU64::new(0),
            total_removed: AtomicU64::new(0),
        }
    }

    /// Append a mutation to the end of the persisted sequence.
    ///
    /// Assigns a fresh id and enqueue timestamp and returns the id. A
    /// persistence failure is returned to the caller so it can be surfaced
    /// as a user-visible warning rather than silently losing the mutation.
    pub async fn append(&self, mutation: &Mutation) -> Result<String, QueueError> {
        let _guard = self.write_lock.lock().await;

        let mut ops = self.load().await?;
        if ops.len() >= self.max_entries {
            return Err(QueueError::Full {
                len: ops.len(),
                max: self.max_entries,
            });
        }

        let op = PendingOperation::from_mutation(mutation);
        let id = op.id.clone();
        ops.push(op);
        self.persist(&ops).await?;

        self.total_appended.fetch_add(1, Ordering::Relaxed);
        crate::metrics::set_queue_depth(ops.len());
        debug!(
            id = %id,
            kind = %mutation.kind(),
            resource = %mutation.resource(),
            depth = ops.len(),
            "mutation queued"
        );
        Ok(id)
    }

    /// All entries in FIFO order.
    ///
    /// Decoded defensively: a corrupt or unreadable blob is treated as an
    /// empty queue rather than failing the caller. Ordering is stable across
    /// repeated calls with no intervening append/remove.
    pub async fn list_all(&self) -> Vec<PendingOperation> {
        match self.store.get(&self.key).await {
            Ok(Some(raw)) => Self::decode(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "queue read failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Delete the entry with the given id. Idempotent: removing an absent id
    /// is a no-op, never an error.
    pub async fn remove(&self, id: &str) -> Result<(), QueueError> {
        let _guard = self.write_lock.lock().await;

        let mut ops = self.load().await?;
        let before = ops.len();
        ops.retain(|op| op.id != id);
        if ops.len() == before {
            return Ok(());
        }

        self.persist(&ops).await?;
        self.total_removed.fetch_add(1, Ordering::Relaxed);
        crate::metrics::set_queue_depth(ops.len());
        debug!(id = %id, depth = ops.len(), "operation removed from queue");
        Ok(())
    }

    /// Current queue depth (drives the UI pending-sync indicator).
    pub async fn len(&self) -> usize {
        self.list_all().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            total_appended: self.total_appended.load(Ordering::Relaxed),
            total_removed: self.total_removed.load(Ordering::Relaxed),
        }
    }

    /// Load for a read-modify-write cycle. Storage errors propagate (the
    /// write path must not clobber a queue it could not read); corrupt
    /// content decodes to empty, matching `list_all`.
    async fn load(&self) -> Result<Vec<PendingOperation>, QueueError> {
        match self.store.get(&self.key).await? {
            Some(raw) => Ok(Self::decode(&raw)),
            None => Ok(Vec::new()),
        }
    }

    async fn persist(&self, ops: &[PendingOperation]) -> Result<(), QueueError> {
        let snapshot = QueueSnapshot {
            version: QUEUE_SCHEMA_VERSION,
            ops: ops.to_vec(),
        };
        let raw = serde_json::to_string(&snapshot).map_err(|e| QueueError::Encoding(e.to_string()))?;
        self.store.set(&self.key, &raw).await?;
        Ok(())
    }

    fn decode(raw: &str) -> Vec<PendingOperation> {
        match serde_json::from_str::<QueueSnapshot>(raw) {
            Ok(snapshot) if snapshot.version == QUEUE_SCHEMA_VERSION => snapshot.ops,
            Ok(snapshot) => {
                warn!(version = snapshot.version, "unknown queue schema version, discarding");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "corrupt queue blob, discarding");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file::FileKv;
    use crate::storage::memory::InMemoryKv;
    use serde_json::json;
    use tempfile::tempdir;

    fn test_queue(store: Arc<InMemoryKv>) -> PendingQueue {
        PendingQueue::new(store, &OfflineSyncConfig::default())
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let queue = test_queue(Arc::new(InMemoryKv::new()));
        assert!(queue.list_all().await.is_empty());
        assert!(queue.is_empty().await);
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn test_append_returns_id_and_preserves_fifo_order() {
        let queue = test_queue(Arc::new(InMemoryKv::new()));

        let mut ids = Vec::new();
        for i in 0..5 {
            let id = queue
                .append(&Mutation::create("tasks", json!({"n": i})))
                .await
                .unwrap();
            ids.push(id);
        }

        let ops = queue.list_all().await;
        assert_eq!(ops.len(), 5);
        for (i, op) in ops.iter().enumerate() {
            assert_eq!(op.id, ids[i]);
            assert_eq!(op.payload.as_ref().unwrap()["n"], i);
        }
    }

    #[tokio::test]
    async fn test_ordering_stable_across_reads() {
        let queue = test_queue(Arc::new(InMemoryKv::new()));
        for i in 0..3 {
            queue
                .append(&Mutation::create("tasks", json!({"n": i})))
                .await
                .unwrap();
        }

        let first: Vec<String> = queue.list_all().await.into_iter().map(|op| op.id).collect();
        let second: Vec<String> = queue.list_all().await.into_iter().map(|op| op.id).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let queue = test_queue(Arc::new(InMemoryKv::new()));
        let id = queue
            .append(&Mutation::delete("expenses", "e1"))
            .await
            .unwrap();

        queue.remove(&id).await.unwrap();
        assert_eq!(queue.len().await, 0);

        // Second removal and removal of an unknown id are no-ops
        queue.remove(&id).await.unwrap();
        queue.remove("never-existed").await.unwrap();
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn test_remove_keeps_relative_order() {
        let queue = test_queue(Arc::new(InMemoryKv::new()));
        let a = queue.append(&Mutation::delete("t", "1")).await.unwrap();
        let b = queue.append(&Mutation::delete("t", "2")).await.unwrap();
        let c = queue.append(&Mutation::delete("t", "3")).await.unwrap();

        queue.remove(&b).await.unwrap();

        let ids: Vec<String> = queue.list_all().await.into_iter().map(|op| op.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[tokio::test]
    async fn test_append_fails_when_storage_unavailable() {
        let store = Arc::new(InMemoryKv::new());
        let queue = test_queue(store.clone());

        queue
            .append(&Mutation::create("tasks", json!({"n": 0})))
            .await
            .unwrap();

        store.set_fail_writes(true);
        let result = queue.append(&Mutation::create("tasks", json!({"n": 1}))).await;
        assert!(matches!(result, Err(QueueError::Storage(_))));

        // The previously persisted entry is untouched
        store.set_fail_writes(false);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_rejected_when_full() {
        let store = Arc::new(InMemoryKv::new());
        let config = OfflineSyncConfig {
            queue_max_entries: 2,
            ..Default::default()
        };
        let queue = PendingQueue::new(store, &config);

        queue.append(&Mutation::delete("t", "1")).await.unwrap();
        queue.append(&Mutation::delete("t", "2")).await.unwrap();

        let result = queue.append(&Mutation::delete("t", "3")).await;
        assert!(matches!(result, Err(QueueError::Full { len: 2, max: 2 })));
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn test_corrupt_blob_treated_as_empty() {
        let store = Arc::new(InMemoryKv::new());
        store.set("pending_operations", "{definitely not json").await.unwrap();

        let queue = test_queue(store);
        assert!(queue.list_all().await.is_empty());

        // And the queue is usable again after the next append
        queue.append(&Mutation::delete("t", "1")).await.unwrap();
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_schema_version_discarded() {
        let store = Arc::new(InMemoryKv::new());
        store
            .set("pending_operations", r#"{"version": 99, "ops": []}"#)
            .await
            .unwrap();

        let queue = test_queue(store);
        assert!(queue.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_across_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let config = OfflineSyncConfig::default();

        {
            let queue = PendingQueue::new(Arc::new(FileKv::new(&path)), &config);
            queue
                .append(&Mutation::create("tasks", json!({"title": "persist me"})))
                .await
                .unwrap();
            queue.append(&Mutation::delete("tasks", "t9")).await.unwrap();
        }

        // Reopen over the same file and verify entries survived in order
        {
            let queue = PendingQueue::new(Arc::new(FileKv::new(&path)), &config);
            let ops = queue.list_all().await;
            assert_eq!(ops.len(), 2);
            assert_eq!(ops[0].resource, "tasks");
            assert_eq!(ops[0].payload.as_ref().unwrap()["title"], "persist me");
            assert_eq!(ops[1].target_id.as_deref(), Some("t9"));
        }
    }

    #[tokio::test]
    async fn test_stats_accumulate() {
        let queue = test_queue(Arc::new(InMemoryKv::new()));

        let id = queue.append(&Mutation::delete("t", "1")).await.unwrap();
        queue.append(&Mutation::delete("t", "2")).await.unwrap();
        queue.remove(&id).await.unwrap();
        queue.remove(&id).await.unwrap(); // no-op, not counted

        let stats = queue.stats();
        assert_eq!(stats.total_appended, 2);
        assert_eq!(stats.total_removed, 1);
    }
}
