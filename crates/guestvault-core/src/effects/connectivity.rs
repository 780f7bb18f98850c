//! Online/offline signal
//!
//! The host environment flips the state; the engine reads it when stamping
//! `offline_created`, when deciding whether a sync attempt can run, and when
//! applying the offline data-loss guard. Subscribers see every transition.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared connectivity state
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Create a signal with the given initial state
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Start online
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Start offline
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Whether the engine is currently online
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Update the state; returns true when this was an offline → online
    /// transition
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.tx.send_replace(online);
        if previous != online {
            tracing::info!(online, "connectivity changed");
        }
        online && !previous
    }

    /// Watch future transitions
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::online()
    }
}
