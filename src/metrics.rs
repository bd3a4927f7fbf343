//! Metrics instrumentation for offline-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `offline_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `resource`: target collection (tasks, expenses, ...)
//! - `kind`: create, update, delete
//! - `status`: applied, deferred, dropped, rejected

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record the outcome of an executed mutation
pub fn record_mutation(resource: &str, kind: &str, status: &str) {
    counter!(
        "offline_sync_mutations_total",
        "resource" => resource.to_string(),
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the outcome of one replay attempt during a sweep
pub fn record_replay(resource: &str, status: &str) {
    counter!(
        "offline_sync_replays_total",
        "resource" => resource.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Set current pending-queue depth
pub fn set_queue_depth(depth: usize) {
    gauge!("offline_sync_queue_depth").set(depth as f64);
}

/// Record a completed sweep
pub fn record_sweep(replayed: usize, dropped: usize) {
    counter!("offline_sync_sweeps_total").increment(1);
    counter!("offline_sync_swept_operations_total", "status" => "replayed")
        .increment(replayed as u64);
    counter!("offline_sync_swept_operations_total", "status" => "dropped")
        .increment(dropped as u64);
}

/// Record sweep duration
pub fn record_sweep_duration(duration: Duration) {
    histogram!("offline_sync_sweep_seconds").record(duration.as_secs_f64());
}

/// Record a connectivity transition
pub fn record_transition(state: &str) {
    counter!(
        "offline_sync_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}
