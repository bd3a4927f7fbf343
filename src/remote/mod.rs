// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote document store interface.
//!
//! The engine treats the hosted backend as an opaque client exposing
//! per-collection create/update/delete plus a network on/off switch. Failures
//! carry an explicit classification: [`RemoteError::is_transient`] is the
//! single decision point both the executor and the sweeper use to choose
//! between "defer for retry" and "propagate as a real error".

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure of a remote mutation.
///
/// `Unavailable` is the connectivity-transient class (the client cannot reach
/// the backend right now but may later); every other variant is permanent and
/// will never succeed on retry.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("backend unreachable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("document not found: {resource}/{target_id}")]
    NotFound { resource: String, target_id: String },
    #[error("invalid mutation: {0}")]
    Invalid(String),
}

impl RemoteError {
    /// Whether this failure is recoverable by deferring and replaying later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Client for the hosted document store.
///
/// Document updates are last-writer-wins field merges server-side, which is
/// what makes whole-queue FIFO replay (rather than per-document ordering)
/// acceptable.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert a new document, returning its server-assigned id.
    async fn create(&self, resource: &str, payload: &Value) -> Result<String, RemoteError>;

    /// Merge a partial field set into an existing document.
    async fn update(&self, resource: &str, target_id: &str, payload: &Value)
        -> Result<(), RemoteError>;

    /// Remove a document.
    async fn delete(&self, resource: &str, target_id: &str) -> Result<(), RemoteError>;

    /// Stop network activity so in-flight operations fail fast with
    /// [`RemoteError::Unavailable`] instead of hanging.
    fn suspend_network(&self);

    /// Resume network activity.
    fn resume_network(&self);
}
