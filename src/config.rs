//! Configuration for the offline sync engine.
//!
//! # Example
//!
//! ```
//! use offline_sync::OfflineSyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = OfflineSyncConfig::default();
//! assert_eq!(config.queue_key, "pending_operations");
//!
//! // Full config
//! let config = OfflineSyncConfig {
//!     queue_key: "sync_outbox".into(),
//!     queue_max_entries: 500,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the offline sync engine.
///
/// All fields have sensible defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineSyncConfig {
    /// Key the encoded queue blob is stored under in local storage
    #[serde(default = "default_queue_key")]
    pub queue_key: String,

    /// Max queued entries before appends are rejected
    #[serde(default = "default_queue_max_entries")]
    pub queue_max_entries: usize,

    /// Whether a sweep re-checks the queue after a clean pass, picking up
    /// entries appended mid-sweep instead of waiting for the next reconnect
    #[serde(default = "default_sweep_recheck")]
    pub sweep_recheck: bool,
}

fn default_queue_key() -> String {
    "pending_operations".to_string()
}
fn default_queue_max_entries() -> usize {
    10_000
}
fn default_sweep_recheck() -> bool {
    true
}

impl Default for OfflineSyncConfig {
    fn default() -> Self {
        Self {
            queue_key: default_queue_key(),
            queue_max_entries: default_queue_max_entries(),
            sweep_recheck: default_sweep_recheck(),
        }
    }
}
