//! Property-based tests for the pending-operation queue.
//!
//! Uses proptest to drive random append/remove interleavings and random
//! persisted blobs, verifying the queue's FIFO and idempotence guarantees
//! and that decoding never panics.
//!
//! Run with: `cargo test --test proptest_fuzz`

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use offline_sync::{InMemoryKv, KeyValueStore, Mutation, OfflineSyncConfig, PendingQueue};

#[derive(Debug, Clone)]
enum QueueAction {
    Append,
    /// Remove the entry at this (wrapped) position of the live queue
    RemoveExisting(usize),
    RemoveUnknown,
}

fn action_strategy() -> impl Strategy<Value = QueueAction> {
    prop_oneof![
        3 => Just(QueueAction::Append),
        1 => (0usize..64).prop_map(QueueAction::RemoveExisting),
        1 => Just(QueueAction::RemoveUnknown),
    ]
}

fn run_queue<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(fut)
}

proptest! {
    /// FIFO order survives arbitrary append/remove interleavings: list_all
    /// always equals the appended ids minus the removed ones, in append order.
    #[test]
    fn fifo_order_preserved_under_interleaving(actions in prop::collection::vec(action_strategy(), 0..40)) {
        run_queue(async move {
            let queue = PendingQueue::new(
                Arc::new(InMemoryKv::new()),
                &OfflineSyncConfig::default(),
            );
            let mut expected: Vec<String> = Vec::new();

            for (i, action) in actions.into_iter().enumerate() {
                match action {
                    QueueAction::Append => {
                        let id = queue
                            .append(&Mutation::create("tasks", json!({"n": i})))
                            .await
                            .expect("append");
                        expected.push(id);
                    }
                    QueueAction::RemoveExisting(pos) => {
                        if !expected.is_empty() {
                            let id = expected.remove(pos % expected.len());
                            queue.remove(&id).await.expect("remove");
                        }
                    }
                    QueueAction::RemoveUnknown => {
                        // Never an error, never touches live entries
                        queue.remove("no-such-id").await.expect("remove unknown");
                    }
                }

                let ids: Vec<String> =
                    queue.list_all().await.into_iter().map(|op| op.id).collect();
                assert_eq!(ids, expected);
            }
        });
    }

    /// Removing the same id twice equals removing it once.
    #[test]
    fn remove_is_idempotent(n in 1usize..10, extra_removes in 1usize..4) {
        run_queue(async move {
            let queue = PendingQueue::new(
                Arc::new(InMemoryKv::new()),
                &OfflineSyncConfig::default(),
            );
            let mut ids = Vec::new();
            for i in 0..n {
                ids.push(
                    queue
                        .append(&Mutation::delete("tasks", format!("t{}", i)))
                        .await
                        .expect("append"),
                );
            }

            let victim = &ids[n / 2];
            for _ in 0..extra_removes {
                queue.remove(victim).await.expect("remove");
            }

            assert_eq!(queue.len().await, n - 1);
            let remaining: Vec<String> =
                queue.list_all().await.into_iter().map(|op| op.id).collect();
            assert!(!remaining.contains(victim));
        });
    }

    /// Arbitrary bytes under the queue key decode to an empty queue, never a
    /// panic or a caller-visible error.
    #[test]
    fn arbitrary_blob_decodes_defensively(blob in ".*") {
        run_queue(async move {
            let kv = Arc::new(InMemoryKv::new());
            kv.set("pending_operations", &blob).await.expect("set");

            let queue = PendingQueue::new(kv, &OfflineSyncConfig::default());
            let ops = queue.list_all().await;

            // Only a well-formed current-version snapshot may yield entries
            if !ops.is_empty() {
                let parsed: serde_json::Value =
                    serde_json::from_str(&blob).expect("entries imply valid JSON");
                assert_eq!(parsed["version"], 1);
            }
        });
    }

    /// A persisted snapshot round-trips exactly through a fresh queue
    /// instance (restart simulation).
    #[test]
    fn snapshot_roundtrip_across_instances(n in 0usize..12) {
        run_queue(async move {
            let kv = Arc::new(InMemoryKv::new());
            let config = OfflineSyncConfig::default();

            let mut ids = Vec::new();
            {
                let queue = PendingQueue::new(kv.clone(), &config);
                for i in 0..n {
                    ids.push(
                        queue
                            .append(&Mutation::create("notes", json!({"n": i})))
                            .await
                            .expect("append"),
                    );
                }
            }

            let queue = PendingQueue::new(kv, &config);
            let reloaded: Vec<String> =
                queue.list_all().await.into_iter().map(|op| op.id).collect();
            assert_eq!(reloaded, ids);
        });
    }
}
