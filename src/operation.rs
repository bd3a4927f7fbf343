//! Mutation and pending-operation data types.
//!
//! A [`Mutation`] is what callers hand to the executor: a typed
//! create/update/delete against a named resource collection. A
//! [`PendingOperation`] is the persisted form of a mutation that could not
//! reach the remote store, stamped with an id and enqueue timestamp.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a deferred mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single mutation against the remote store.
///
/// The variants carry exactly the fields each kind requires, so a malformed
/// mutation (an update without a target, a create without a payload) cannot
/// be constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a new document into `resource`.
    Create { resource: String, payload: Value },
    /// Merge a partial field set into an existing document.
    Update {
        resource: String,
        target_id: String,
        payload: Value,
    },
    /// Remove a document.
    Delete { resource: String, target_id: String },
}

impl Mutation {
    pub fn create(resource: impl Into<String>, payload: Value) -> Self {
        Self::Create {
            resource: resource.into(),
            payload,
        }
    }

    pub fn update(resource: impl Into<String>, target_id: impl Into<String>, payload: Value) -> Self {
        Self::Update {
            resource: resource.into(),
            target_id: target_id.into(),
            payload,
        }
    }

    pub fn delete(resource: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::Delete {
            resource: resource.into(),
            target_id: target_id.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Update { .. } => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        match self {
            Self::Create { resource, .. }
            | Self::Update { resource, .. }
            | Self::Delete { resource, .. } => resource,
        }
    }

    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Create { .. } => None,
            Self::Update { target_id, .. } | Self::Delete { target_id, .. } => Some(target_id),
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Create { payload, .. } | Self::Update { payload, .. } => Some(payload),
            Self::Delete { .. } => None,
        }
    }
}

/// A deferred mutation as persisted in the pending-operation queue.
///
/// `target_id` is present for update/delete, `payload` for create/update.
/// Records are immutable once enqueued: a superseding mutation becomes a new
/// queue entry, never an in-place edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOperation {
    pub id: String,
    pub kind: OperationKind,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Enqueue timestamp (epoch millis), used for ordering diagnostics.
    pub enqueued_at: i64,
}

impl PendingOperation {
    /// Build a queue record from a mutation, assigning a fresh id and
    /// enqueue timestamp.
    pub(crate) fn from_mutation(mutation: &Mutation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: mutation.kind(),
            resource: mutation.resource().to_string(),
            target_id: mutation.target_id().map(str::to_string),
            payload: mutation.payload().cloned(),
            enqueued_at: now_millis(),
        }
    }
}

/// Current time as epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
