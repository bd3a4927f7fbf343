// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Offline sync engine coordinator.
//!
//! The [`OfflineEngine`] ties the components together as one explicitly
//! constructed service object: the connectivity monitor, the durable pending
//! queue, the offline-aware executor and the reconciliation sweeper. It is
//! built at application startup, injected into whatever needs it, and torn
//! down at shutdown; there is no ambient global state.
//!
//! # Lifecycle
//!
//! ```text
//! Created → Running → ShuttingDown
//! ```
//!
//! While running, a background task watches connectivity transitions:
//! going offline suspends the remote client's network activity (so in-flight
//! calls fail fast), and coming back online resumes it and then triggers
//! exactly one sweep.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::OfflineSyncConfig;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::executor::{ExecuteError, Executor, MutationOutcome};
use crate::operation::Mutation;
use crate::queue::{PendingQueue, QueueStats};
use crate::remote::RemoteStore;
use crate::storage::traits::KeyValueStore;
use crate::sweeper::{SweepReport, Sweeper, SweeperStats};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Just created, transition loop not yet running
    Created,
    /// Watching connectivity and accepting mutations
    Running,
    /// Shutdown requested
    ShuttingDown,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}

/// Connectivity and queue-depth summary for a UI indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub state: ConnectivityState,
    pub pending: usize,
    pub message: String,
}

impl SyncStatus {
    /// Whether an indicator is worth showing (offline, or work pending).
    #[must_use]
    pub fn should_show(&self) -> bool {
        self.state.is_offline() || self.pending > 0
    }
}

/// Main offline sync coordinator.
pub struct OfflineEngine {
    monitor: Arc<ConnectivityMonitor>,
    queue: Arc<PendingQueue>,
    remote: Arc<dyn RemoteStore>,
    executor: Executor,
    sweeper: Arc<Sweeper>,
    state: watch::Sender<EngineState>,
    state_rx: watch::Receiver<EngineState>,
    transition_task: Mutex<Option<JoinHandle<()>>>,
}

impl OfflineEngine {
    /// Create a new engine.
    ///
    /// `initial_online` is the runtime's reported network status at startup;
    /// `None` (unknown) defaults to online. The engine starts in `Created`
    /// state; call [`start()`](Self::start) to begin watching transitions.
    pub fn new(
        config: OfflineSyncConfig,
        initial_online: Option<bool>,
        remote: Arc<dyn RemoteStore>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let monitor = Arc::new(ConnectivityMonitor::new(initial_online));
        let queue = Arc::new(PendingQueue::new(storage, &config));
        let sweeper = Arc::new(Sweeper::new(queue.clone(), remote.clone(), config.sweep_recheck));
        let executor = Executor::new(monitor.clone(), queue.clone(), remote.clone());
        let (state, state_rx) = watch::channel(EngineState::Created);

        Self {
            monitor,
            queue,
            remote,
            executor,
            sweeper,
            state,
            state_rx,
            transition_task: Mutex::new(None),
        }
    }

    /// Start the transition loop.
    ///
    /// Aligns the remote client's network mode with the current status, then
    /// drains any queue entries left over from a previous run if we are
    /// online (they survived the restart; no transition will arrive to flush
    /// them otherwise).
    pub async fn start(&self) {
        match self.monitor.status() {
            ConnectivityState::Offline => self.remote.suspend_network(),
            ConnectivityState::Online => self.remote.resume_network(),
        }

        // Subscribe before spawning so a transition racing start() is not
        // missed; the state as of this point was aligned above
        let mut rx = self.monitor.subscribe();
        let _ = *rx.borrow_and_update();
        let remote = self.remote.clone();
        let sweeper = self.sweeper.clone();
        let handle = tokio::spawn(async move {
            Self::transition_loop(rx, remote, sweeper).await;
        });
        *self.transition_task.lock().await = Some(handle);
        let _ = self.state.send(EngineState::Running);
        info!(status = %self.monitor.status(), "offline engine started");

        if self.monitor.status().is_online() && !self.queue.is_empty().await {
            self.sweeper.sweep().await;
        }
    }

    /// Stop the transition loop.
    pub async fn shutdown(&self) {
        let _ = self.state.send(EngineState::ShuttingDown);
        if let Some(handle) = self.transition_task.lock().await.take() {
            handle.abort();
        }
        info!("offline engine stopped");
    }

    async fn transition_loop(
        mut rx: watch::Receiver<ConnectivityState>,
        remote: Arc<dyn RemoteStore>,
        sweeper: Arc<Sweeper>,
    ) {
        while rx.changed().await.is_ok() {
            let status = *rx.borrow_and_update();
            crate::metrics::record_transition(&status.to_string());
            match status {
                ConnectivityState::Offline => {
                    debug!("suspending remote network activity");
                    remote.suspend_network();
                }
                ConnectivityState::Online => {
                    debug!("resuming remote network activity");
                    remote.resume_network();
                    sweeper.sweep().await;
                }
            }
        }
    }

    /// Current engine lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Execute a mutation, deferring it if the remote store is unreachable.
    pub async fn execute(&self, mutation: Mutation) -> Result<MutationOutcome, ExecuteError> {
        self.executor.execute(mutation).await
    }

    /// Manually trigger a sweep (safety net besides the transition trigger).
    pub async fn sweep(&self) -> SweepReport {
        self.sweeper.sweep().await
    }

    /// Current connectivity state.
    #[must_use]
    pub fn status(&self) -> ConnectivityState {
        self.monitor.status()
    }

    /// Subscribe to connectivity transitions (for a UI indicator).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.monitor.subscribe()
    }

    /// Report that the runtime regained network connectivity.
    pub fn report_online(&self) {
        self.monitor.report_online();
    }

    /// Report that the runtime lost network connectivity.
    pub fn report_offline(&self) {
        self.monitor.report_offline();
    }

    /// Number of mutations waiting for replay.
    pub async fn pending_count(&self) -> usize {
        self.queue.len().await
    }

    /// Connectivity plus queue depth, with a display message.
    pub async fn status_info(&self) -> SyncStatus {
        let state = self.monitor.status();
        let pending = self.queue.len().await;
        let message = match state {
            ConnectivityState::Online if pending > 0 => {
                format!("Online - syncing {} pending changes", pending)
            }
            ConnectivityState::Online => "Online".to_string(),
            ConnectivityState::Offline if pending > 0 => {
                format!("Offline - {} pending changes", pending)
            }
            ConnectivityState::Offline => "Offline".to_string(),
        };
        SyncStatus {
            state,
            pending,
            message,
        }
    }

    /// Queue lifetime counters.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Sweeper lifetime counters.
    #[must_use]
    pub fn sweeper_stats(&self) -> SweeperStats {
        self.sweeper.stats()
    }
}
