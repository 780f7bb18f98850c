//! Domain events and the broadcast bus they are published on
//!
//! UI and telemetry collaborators subscribe to the bus; publishing never
//! blocks and never fails when nobody is listening.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{GuestRecord, RecordId};

/// Default bus capacity before slow subscribers start lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Summary published after a retention sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSummary {
    /// Records demoted plus records purged
    pub cleaned_count: usize,
    /// Records moved to manager-only
    pub demoted: usize,
    /// Records removed from every partition
    pub purged: usize,
    /// Document images dropped past their retention
    pub images_pruned: usize,
    /// Audit entries dropped past their retention
    pub audit_entries_pruned: usize,
    /// Records skipped by the offline data-loss guard
    pub offline_protected: usize,
}

/// Event published by the data store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum VaultEvent {
    /// A record was created
    #[serde(rename = "userData:saved")]
    UserDataSaved(Box<GuestRecord>),
    /// A record's fields changed
    #[serde(rename = "userData:updated")]
    UserDataUpdated(Box<GuestRecord>),
    /// A record was removed or flagged for deletion
    #[serde(rename = "userData:deleted")]
    UserDataDeleted {
        /// Deleted record
        id: RecordId,
        /// Flagged for manager approval rather than removed
        pending_approval: bool,
    },
    /// Reception permissions changed
    #[serde(rename = "permissions:updated")]
    PermissionsUpdated(Box<GuestRecord>),
    /// A retention sweep finished
    #[serde(rename = "data:cleanup")]
    DataCleanup(CleanupSummary),
    /// A record reached the remote
    #[serde(rename = "data:synced")]
    DataSynced(Box<GuestRecord>),
    /// A record was demoted to manager-only
    #[serde(rename = "data:movedToManager")]
    DataMovedToManager(Box<GuestRecord>),
}

impl VaultEvent {
    /// Topic name as seen by subscribers
    pub fn topic(&self) -> &'static str {
        match self {
            VaultEvent::UserDataSaved(_) => "userData:saved",
            VaultEvent::UserDataUpdated(_) => "userData:updated",
            VaultEvent::UserDataDeleted { .. } => "userData:deleted",
            VaultEvent::PermissionsUpdated(_) => "permissions:updated",
            VaultEvent::DataCleanup(_) => "data:cleanup",
            VaultEvent::DataSynced(_) => "data:synced",
            VaultEvent::DataMovedToManager(_) => "data:movedToManager",
        }
    }

    /// Record the event is about, if it concerns a single record
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            VaultEvent::UserDataSaved(record)
            | VaultEvent::UserDataUpdated(record)
            | VaultEvent::PermissionsUpdated(record)
            | VaultEvent::DataSynced(record)
            | VaultEvent::DataMovedToManager(record) => Some(record.id),
            VaultEvent::UserDataDeleted { id, .. } => Some(*id),
            VaultEvent::DataCleanup(_) => None,
        }
    }
}

/// Broadcast bus for [`VaultEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VaultEvent>,
}

impl EventBus {
    /// Create a bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, event: VaultEvent) -> usize {
        let topic = event.topic();
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::trace!(topic, receivers, "published event");
                receivers
            }
            Err(_) => 0,
        }
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.tx.subscribe()
    }

    /// Current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
