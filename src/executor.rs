// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Offline-aware mutation executor.
//!
//! Routes one mutation either to the remote store or to the pending queue,
//! transparently to the caller. A mutation made while offline, or that fails
//! for a connectivity reason while online, is accepted as deferred and never
//! surfaces as an error; genuine (permanent) failures propagate immediately.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::operation::Mutation;
use crate::queue::{PendingQueue, QueueError};
use crate::remote::{RemoteError, RemoteStore};

/// Successful outcome of [`Executor::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Confirmed by the remote store. `created_id` carries the
    /// server-assigned id for creates.
    Applied { created_id: Option<String> },
    /// Accepted locally and queued for replay once connectivity returns.
    Deferred { op_id: String },
}

impl MutationOutcome {
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Permanent remote failure (validation, permission, not-found).
    /// Connectivity failures never take this path.
    #[error(transparent)]
    Remote(RemoteError),
    /// The mutation could not be queued; it was NOT applied anywhere and the
    /// caller should warn the user rather than pretend it succeeded.
    #[error("failed to queue mutation: {0}")]
    Queue(#[from] QueueError),
}

/// Routes mutations between the remote store and the pending queue.
pub struct Executor {
    monitor: Arc<ConnectivityMonitor>,
    queue: Arc<PendingQueue>,
    remote: Arc<dyn RemoteStore>,
}

impl Executor {
    pub fn new(
        monitor: Arc<ConnectivityMonitor>,
        queue: Arc<PendingQueue>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            monitor,
            queue,
            remote,
        }
    }

    /// Execute a mutation, deferring it when the remote store is out of
    /// reach.
    ///
    /// The caller's optimistic local state update is independent of the
    /// outcome: `Deferred` means the mutation is safely queued, not failed.
    pub async fn execute(&self, mutation: Mutation) -> Result<MutationOutcome, ExecuteError> {
        if self.monitor.status().is_offline() {
            let op_id = self.queue.append(&mutation).await?;
            debug!(
                kind = %mutation.kind(),
                resource = %mutation.resource(),
                op_id = %op_id,
                "offline, mutation deferred"
            );
            crate::metrics::record_mutation(mutation.resource(), mutation.kind().as_str(), "deferred");
            return Ok(MutationOutcome::Deferred { op_id });
        }

        match self.dispatch(&mutation).await {
            Ok(created_id) => {
                debug!(
                    kind = %mutation.kind(),
                    resource = %mutation.resource(),
                    "mutation applied remotely"
                );
                crate::metrics::record_mutation(mutation.resource(), mutation.kind().as_str(), "applied");
                Ok(MutationOutcome::Applied { created_id })
            }
            Err(err) if err.is_transient() => {
                // A connectivity blip while nominally online is deferred like
                // the offline path, not shown to the caller as an error
                warn!(
                    kind = %mutation.kind(),
                    resource = %mutation.resource(),
                    error = %err,
                    "remote unreachable, mutation deferred"
                );
                let op_id = self.queue.append(&mutation).await?;
                crate::metrics::record_mutation(mutation.resource(), mutation.kind().as_str(), "deferred");
                Ok(MutationOutcome::Deferred { op_id })
            }
            Err(err) => {
                warn!(
                    kind = %mutation.kind(),
                    resource = %mutation.resource(),
                    error = %err,
                    "mutation rejected by remote store"
                );
                crate::metrics::record_mutation(mutation.resource(), mutation.kind().as_str(), "rejected");
                Err(ExecuteError::Remote(err))
            }
        }
    }

    async fn dispatch(&self, mutation: &Mutation) -> Result<Option<String>, RemoteError> {
        match mutation {
            Mutation::Create { resource, payload } => {
                self.remote.create(resource, payload).await.map(Some)
            }
            Mutation::Update {
                resource,
                target_id,
                payload,
            } => self
                .remote
                .update(resource, target_id, payload)
                .await
                .map(|()| None),
            Mutation::Delete {
                resource,
                target_id,
            } => self
                .remote
                .delete(resource, target_id)
                .await
                .map(|()| None),
        }
    }
}
