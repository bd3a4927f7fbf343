// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reconciliation sweeper.
//!
//! Replays queued mutations against the remote store once connectivity is
//! restored, draining the queue as far as currently possible. Each pass
//! snapshots the queue once and iterates it in FIFO order: a replayed entry
//! is removed on success, a transient failure halts the pass (connectivity
//! was apparently lost again), and a permanent failure drops the entry with
//! a logged diagnostic so the queue cannot leak forever-failing operations.
//!
//! At most one sweep runs at a time; a sweep triggered mid-sweep coalesces
//! into a no-op. After a clean pass the queue is re-checked so entries
//! appended after the snapshot are replayed immediately instead of waiting
//! for an unrelated future reconnect.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::operation::{OperationKind, PendingOperation};
use crate::queue::PendingQueue;
use crate::remote::{RemoteError, RemoteStore};

/// Outcome of one [`Sweeper::sweep`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries replayed successfully and removed
    pub replayed: usize,
    /// Entries dropped after a permanent replay failure
    pub dropped: usize,
    /// Entries still queued when the sweep returned
    pub remaining: usize,
    /// Whether the sweep stopped early on renewed connectivity loss
    pub halted: bool,
    /// Whether this call was a no-op because a sweep was already running
    pub coalesced: bool,
}

/// Lifetime counters for observability
#[derive(Debug, Clone, Copy)]
pub struct SweeperStats {
    pub total_replayed: u64,
    pub total_dropped: u64,
    pub sweeps_completed: u64,
}

/// Drains the pending queue against the remote store.
pub struct Sweeper {
    queue: Arc<PendingQueue>,
    remote: Arc<dyn RemoteStore>,
    /// Re-check the queue after a clean pass
    recheck: bool,
    /// Whether a sweep is currently in flight
    sweeping: AtomicBool,
    total_replayed: AtomicU64,
    total_dropped: AtomicU64,
    sweeps_completed: AtomicU64,
}

impl Sweeper {
    pub fn new(queue: Arc<PendingQueue>, remote: Arc<dyn RemoteStore>, recheck: bool) -> Self {
        Self {
            queue,
            remote,
            recheck,
            sweeping: AtomicBool::new(false),
            total_replayed: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            sweeps_completed: AtomicU64::new(0),
        }
    }

    /// Replay queued mutations in FIFO order.
    ///
    /// Invoked by the engine on every Offline→Online transition; safe to call
    /// manually or periodically as a safety net.
    pub async fn sweep(&self) -> SweepReport {
        if self.sweeping.swap(true, Ordering::AcqRel) {
            debug!("sweep already in flight, coalescing");
            return SweepReport {
                coalesced: true,
                ..SweepReport::default()
            };
        }
        let _guard = SweepGuard(&self.sweeping);
        let start = Instant::now();

        let mut report = SweepReport::default();
        loop {
            let snapshot = self.queue.list_all().await;
            if snapshot.is_empty() {
                break;
            }
            info!(pending = snapshot.len(), "starting reconciliation pass");

            if self.replay_pass(&snapshot, &mut report).await {
                report.halted = true;
                break;
            }
            if !self.recheck {
                break;
            }
            // Loop once more: entries appended after the snapshot was taken
            // are picked up now rather than on the next reconnect
        }

        report.remaining = self.queue.len().await;
        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_sweep(report.replayed, report.dropped);
        crate::metrics::record_sweep_duration(start.elapsed());
        crate::metrics::set_queue_depth(report.remaining);

        if report.halted {
            warn!(
                replayed = report.replayed,
                dropped = report.dropped,
                remaining = report.remaining,
                "sweep halted, connectivity lost again"
            );
        } else {
            info!(
                replayed = report.replayed,
                dropped = report.dropped,
                remaining = report.remaining,
                "sweep complete"
            );
        }
        report
    }

    #[must_use]
    pub fn stats(&self) -> SweeperStats {
        SweeperStats {
            total_replayed: self.total_replayed.load(Ordering::Relaxed),
            total_dropped: self.total_dropped.load(Ordering::Relaxed),
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
        }
    }

    /// Replay one snapshot in order. Returns true if the pass halted.
    async fn replay_pass(&self, snapshot: &[PendingOperation], report: &mut SweepReport) -> bool {
        for op in snapshot {
            match self.replay(op).await {
                Ok(()) => {
                    if let Err(e) = self.queue.remove(&op.id).await {
                        // Leaving a replayed entry queued would duplicate it
                        // on the next pass; stop and let a later sweep retry
                        // once storage is back
                        error!(id = %op.id, error = %e, "failed to remove replayed operation, halting sweep");
                        return true;
                    }
                    report.replayed += 1;
                    self.total_replayed.fetch_add(1, Ordering::Relaxed);
                    crate::metrics::record_replay(&op.resource, "replayed");
                    debug!(id = %op.id, kind = %op.kind, resource = %op.resource, "operation replayed");
                }
                Err(err) if err.is_transient() => {
                    // The store is down again; the entry stays queued and the
                    // rest of the snapshot waits for the next transition
                    warn!(id = %op.id, error = %err, "connectivity lost mid-sweep, halting");
                    crate::metrics::record_replay(&op.resource, "deferred");
                    return true;
                }
                Err(err) => {
                    // This operation can never succeed; retrying forever
                    // would leak the queue. No caller is waiting, so log only.
                    error!(
                        id = %op.id,
                        kind = %op.kind,
                        resource = %op.resource,
                        error = %err,
                        "dropping operation that can never succeed"
                    );
                    if let Err(e) = self.queue.remove(&op.id).await {
                        error!(id = %op.id, error = %e, "failed to drop operation, halting sweep");
                        return true;
                    }
                    report.dropped += 1;
                    self.total_dropped.fetch_add(1, Ordering::Relaxed);
                    crate::metrics::record_replay(&op.resource, "dropped");
                }
            }
        }
        false
    }

    /// Dispatch one queued record to the matching remote primitive. Records
    /// missing a required field (possible only via a hand-edited blob) are
    /// classified permanent so they get dropped instead of wedging the queue.
    async fn replay(&self, op: &PendingOperation) -> Result<(), RemoteError> {
        match op.kind {
            OperationKind::Create => {
                let payload = op
                    .payload
                    .as_ref()
                    .ok_or_else(|| RemoteError::Invalid("create without payload".to_string()))?;
                self.remote.create(&op.resource, payload).await.map(|_| ())
            }
            OperationKind::Update => {
                let target_id = op
                    .target_id
                    .as_deref()
                    .ok_or_else(|| RemoteError::Invalid("update without target id".to_string()))?;
                let payload = op
                    .payload
                    .as_ref()
                    .ok_or_else(|| RemoteError::Invalid("update without payload".to_string()))?;
                self.remote.update(&op.resource, target_id, payload).await
            }
            OperationKind::Delete => {
                let target_id = op
                    .target_id
                    .as_deref()
                    .ok_or_else(|| RemoteError::Invalid("delete without target id".to_string()))?;
                self.remote.delete(&op.resource, target_id).await
            }
        }
    }
}

/// RAII guard to reset the sweeping flag.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
