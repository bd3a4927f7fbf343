//! Connectivity tracking.
//!
//! The [`ConnectivityMonitor`] is the single source of truth for "can we
//! currently reach the remote store". The embedder feeds it the runtime's
//! network signals; the executor reads the current state and the engine's
//! transition loop subscribes for change notifications.

use tokio::sync::watch;
use tracing::info;

/// Current reachability of the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Tracks online/offline status and broadcasts transitions.
///
/// Subscribers are woken exactly once per transition; repeated signals of the
/// same state produce no notification. None of the monitor's operations fail.
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectivityState>,
    state_rx: watch::Receiver<ConnectivityState>,
}

impl ConnectivityMonitor {
    /// Create a monitor from the runtime's reported network status at
    /// startup. `None` (status unknown) defaults to online.
    #[must_use]
    pub fn new(initial_online: Option<bool>) -> Self {
        let initial = match initial_online {
            Some(false) => ConnectivityState::Offline,
            _ => ConnectivityState::Online,
        };
        let (state, state_rx) = watch::channel(initial);
        Self { state, state_rx }
    }

    /// Last known connectivity state.
    #[must_use]
    pub fn status(&self) -> ConnectivityState {
        *self.state_rx.borrow()
    }

    /// Subscribe to transition notifications.
    ///
    /// The receiver's `changed()` resolves once per Offline→Online or
    /// Online→Offline transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state_rx.clone()
    }

    /// Report that the runtime regained network connectivity.
    pub fn report_online(&self) {
        self.set(ConnectivityState::Online);
    }

    /// Report that the runtime lost network connectivity.
    pub fn report_offline(&self) {
        self.set(ConnectivityState::Offline);
    }

    fn set(&self, next: ConnectivityState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            info!(state = %next, "connectivity changed");
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(None)
    }
}
