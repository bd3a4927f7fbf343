//! In-memory remote store double.
//!
//! Backs collections with a [`DashMap`] and models the network switch as a
//! flag: while suspended, every call fails fast with
//! [`RemoteError::Unavailable`]. Failures can also be injected per-call,
//! and every attempted mutation is recorded for inspection, which is what
//! the replay tests assert against.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::{RemoteError, RemoteStore};
use crate::operation::OperationKind;

/// One attempted mutation, recorded in call order (failed attempts included).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: OperationKind,
    pub resource: String,
    pub target_id: Option<String>,
    pub payload: Option<Value>,
}

/// [`RemoteStore`] backed by process memory.
pub struct InMemoryRemote {
    collections: DashMap<String, DashMap<String, Value>>,
    suspended: AtomicBool,
    /// Failures keyed by 1-based call number
    injected_failures: Mutex<HashMap<u64, RemoteError>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            suspended: AtomicBool::new(false),
            injected_failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue an error for the next unclaimed mutation attempt. Repeated
    /// calls without intervening attempts claim consecutive calls.
    pub fn fail_next(&self, err: RemoteError) {
        let current = self.calls.lock().len() as u64;
        let mut failures = self.injected_failures.lock();
        let mut n = current + 1;
        while failures.contains_key(&n) {
            n += 1;
        }
        failures.insert(n, err);
    }

    /// Fail the `n`-th mutation attempt from now (1-based), counting both
    /// successful and failing attempts.
    pub fn fail_nth(&self, n: u64, err: RemoteError) {
        let current = self.calls.lock().len() as u64;
        self.injected_failures.lock().insert(current + n, err);
    }

    /// Insert a document directly, bypassing the gate and the call log.
    /// Lets tests pre-populate state with known ids.
    pub fn seed(&self, resource: &str, id: &str, payload: Value) {
        self.collections
            .entry(resource.to_string())
            .or_default()
            .insert(id.to_string(), payload);
    }

    /// All mutation attempts so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of mutation attempts so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Fetch a stored document.
    #[must_use]
    pub fn document(&self, resource: &str, id: &str) -> Option<Value> {
        self.collections
            .get(resource)
            .and_then(|docs| docs.get(id).map(|d| d.value().clone()))
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn collection_len(&self, resource: &str) -> usize {
        self.collections.get(resource).map_or(0, |docs| docs.len())
    }

    /// Whether network activity is currently suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// Record an attempt and return its 1-based call number.
    fn record(
        &self,
        kind: OperationKind,
        resource: &str,
        target_id: Option<&str>,
        payload: Option<&Value>,
    ) -> u64 {
        let mut calls = self.calls.lock();
        calls.push(RecordedCall {
            kind,
            resource: resource.to_string(),
            target_id: target_id.map(str::to_string),
            payload: payload.cloned(),
        });
        calls.len() as u64
    }

    fn gate(&self, call_no: u64) -> Result<(), RemoteError> {
        if let Some(err) = self.injected_failures.lock().remove(&call_no) {
            return Err(err);
        }
        if self.suspended.load(Ordering::Acquire) {
            return Err(RemoteError::Unavailable("network suspended".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn create(&self, resource: &str, payload: &Value) -> Result<String, RemoteError> {
        let call_no = self.record(OperationKind::Create, resource, None, Some(payload));
        self.gate(call_no)?;

        let id = Uuid::new_v4().to_string();
        self.collections
            .entry(resource.to_string())
            .or_default()
            .insert(id.clone(), payload.clone());
        Ok(id)
    }

    async fn update(
        &self,
        resource: &str,
        target_id: &str,
        payload: &Value,
    ) -> Result<(), RemoteError> {
        let call_no = self.record(OperationKind::Update, resource, Some(target_id), Some(payload));
        self.gate(call_no)?;

        let docs = self
            .collections
            .get(resource)
            .ok_or_else(|| RemoteError::NotFound {
                resource: resource.to_string(),
                target_id: target_id.to_string(),
            })?;
        let mut doc = docs.get_mut(target_id).ok_or_else(|| RemoteError::NotFound {
            resource: resource.to_string(),
            target_id: target_id.to_string(),
        })?;

        // Last-writer-wins field merge; non-object payloads replace wholesale
        match (doc.value_mut(), payload) {
            (Value::Object(existing), Value::Object(patch)) => {
                for (k, v) in patch {
                    existing.insert(k.clone(), v.clone());
                }
            }
            (existing, _) => *existing = payload.clone(),
        }
        Ok(())
    }

    async fn delete(&self, resource: &str, target_id: &str) -> Result<(), RemoteError> {
        let call_no = self.record(OperationKind::Delete, resource, Some(target_id), None);
        self.gate(call_no)?;

        // Deleting an absent document is a no-op, so replay stays idempotent
        if let Some(docs) = self.collections.get(resource) {
            docs.remove(target_id);
        }
        Ok(())
    }

    fn suspend_network(&self) {
        self.suspended.store(true, Ordering::Release);
    }

    fn resume_network(&self) {
        self.suspended.store(false, Ordering::Release);
    }
}
