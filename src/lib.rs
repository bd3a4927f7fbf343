//! # Offline Sync
//!
//! An offline-resilience engine for applications backed by a remote document
//! store: keep accepting mutations while the network is down, queue them
//! durably, and reconcile once connectivity returns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Mutation callers (UI)                   │
//! │  • execute(create/update/delete) against a collection      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Offline-Aware Executor                       │
//! │  • Online: call the remote store directly                  │
//! │  • Offline or transient failure: defer to the queue        │
//! │  • Permanent failure: propagate to the caller              │
//! └──────────────┬───────────────────────────┬──────────────────┘
//!                │                           │
//!                ▼                           ▼
//! ┌──────────────────────────┐  ┌──────────────────────────────┐
//! │  Remote store (opaque)   │  │  Pending queue (durable)     │
//! │  • create/update/delete  │  │  • FIFO log, one blob under  │
//! │  • network on/off switch │  │    a fixed key, survives     │
//! └──────────────────────────┘  │    restarts                  │
//!                ▲              └──────────────────────────────┘
//!                │                           │
//! ┌──────────────┴───────────────────────────▼──────────────────┐
//! │               Reconciliation Sweeper                        │
//! │  • Triggered once per Offline→Online transition            │
//! │  • Replays FIFO, removes on success, halts on renewed      │
//! │    connectivity loss, drops permanent failures             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use offline_sync::{InMemoryRemote, Mutation, OfflineEngine, OfflineSyncConfig};
//! use offline_sync::FileKv;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let remote = Arc::new(InMemoryRemote::new());
//!     let storage = Arc::new(FileKv::new("offline_queue.json"));
//!
//!     let engine = OfflineEngine::new(
//!         OfflineSyncConfig::default(),
//!         Some(true), // runtime-reported network status at startup
//!         remote,
//!         storage,
//!     );
//!     engine.start().await;
//!
//!     // Mutations route transparently: applied remotely when reachable,
//!     // queued for replay when not
//!     let outcome = engine
//!         .execute(Mutation::create("tasks", json!({"title": "Buy milk"})))
//!         .await
//!         .expect("mutation failed");
//!     println!("deferred: {}", outcome.is_deferred());
//!
//!     // Feed network signals from the runtime
//!     engine.report_offline();
//!     engine.report_online(); // triggers a reconciliation sweep
//!
//!     engine.shutdown().await;
//! }
//! ```
//!
//! ## Features
//!
//! - **Transparent deferral**: a mutation made while offline never looks
//!   like a failure to the caller, it is queued and replayed later
//! - **Durable FIFO queue**: survives full application restarts, versioned
//!   encoding, defensively decoded
//! - **Failure classification**: a tagged error type separates
//!   connectivity-transient failures (deferred) from permanent ones
//!   (surfaced immediately, or dropped with a diagnostic during replay)
//! - **Bounded reconciliation**: one sweep at a time, halts as soon as the
//!   store is unreachable again, re-checks for late appends
//! - **Explicit lifecycle**: a constructed service object, not ambient
//!   global state
//!
//! ## Modules
//!
//! - [`engine`]: the [`OfflineEngine`] coordinator and lifecycle
//! - [`executor`]: offline-aware mutation routing
//! - [`sweeper`]: queue replay on reconnect
//! - [`queue`]: the durable pending-operation store
//! - [`connectivity`]: online/offline tracking and transition notifications
//! - [`remote`]: the remote document-store interface and in-memory double
//! - [`storage`]: key-value persistence backends
//! - [`operation`]: mutation and queue-record types

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod executor;
pub mod metrics;
pub mod operation;
pub mod queue;
pub mod remote;
pub mod storage;
pub mod sweeper;

pub use config::OfflineSyncConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivityState};
pub use engine::{EngineState, OfflineEngine, SyncStatus};
pub use executor::{ExecuteError, Executor, MutationOutcome};
pub use operation::{Mutation, OperationKind, PendingOperation};
pub use queue::{PendingQueue, QueueError, QueueStats};
pub use remote::memory::{InMemoryRemote, RecordedCall};
pub use remote::{RemoteError, RemoteStore};
pub use storage::file::FileKv;
pub use storage::memory::InMemoryKv;
pub use storage::traits::{KeyValueStore, StorageError};
pub use sweeper::{SweepReport, Sweeper, SweeperStats};
