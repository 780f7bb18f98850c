//! Retention sweeper
//!
//! One sweep runs four phases under the store write lock:
//!
//! 1. demote reception records whose reception window closed
//! 2. purge manager records past `expires_at` from every partition
//! 3. housekeeping: stale document images and audit entries
//! 4. publish [`VaultEvent::DataCleanup`]
//!
//! Records protected by the offline data-loss guard are skipped in phases 1
//! and 2. Overlapping sweeps are not allowed; a sweep that finds another one
//! running returns `Ok(None)` without touching anything.

use guestvault_authorization::ExpirationCalculator;
use guestvault_core::{
    CleanupSummary, Connectivity, EventBus, Location, RetentionPolicy, TimeSource, VaultError,
    VaultEvent,
};
use guestvault_store::{AuditTrail, PartitionedStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::retention::{demote_to_manager, housekeep, offline_guarded};

/// Clears the running flag when a sweep ends, including on error
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic retention enforcement over both partitions
#[derive(Clone)]
pub struct RetentionSweeper {
    store: PartitionedStore,
    policy: RetentionPolicy,
    trail: AuditTrail,
    clock: Arc<dyn TimeSource>,
    connectivity: Connectivity,
    events: EventBus,
    running: Arc<AtomicBool>,
}

impl RetentionSweeper {
    /// Create a sweeper
    pub fn new(
        store: PartitionedStore,
        policy: RetentionPolicy,
        clock: Arc<dyn TimeSource>,
        connectivity: Connectivity,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            policy,
            trail: AuditTrail::default(),
            clock,
            connectivity,
            events,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a specific audit trail bound
    pub fn with_audit_trail(mut self, trail: AuditTrail) -> Self {
        self.trail = trail;
        self
    }

    /// Policy in effect
    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Whether a sweep is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one sweep; `Ok(None)` when another sweep was already running
    pub async fn run_once(&self) -> Result<Option<CleanupSummary>, VaultError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("retention sweep already running, skipping");
            return Ok(None);
        }
        let _running = RunningGuard(&self.running);

        let summary = self.sweep().await.map_err(|e| {
            error!(error = %e, "retention sweep failed");
            e
        })?;

        info!(
            cleaned = summary.cleaned_count,
            demoted = summary.demoted,
            purged = summary.purged,
            images_pruned = summary.images_pruned,
            audit_entries_pruned = summary.audit_entries_pruned,
            offline_protected = summary.offline_protected,
            "retention sweep finished"
        );
        self.events.publish(VaultEvent::DataCleanup(summary.clone()));
        Ok(Some(summary))
    }

    async fn sweep(&self) -> Result<CleanupSummary, VaultError> {
        let _guard = self.store.lock().await;
        let now = self.clock.now();
        let online = self.connectivity.is_online();
        let mut summary = CleanupSummary::default();

        // Phase 1: demotion
        for mut record in self.store.load_partition(Location::Reception).await? {
            if !ExpirationCalculator::is_expired(&record, Location::Reception, now) {
                continue;
            }
            if offline_guarded(&record, online, &self.policy, now) {
                debug!(record_id = %record.id, "offline guard kept expired reception record");
                summary.offline_protected += 1;
                continue;
            }
            demote_to_manager(&mut record, &self.policy, &self.trail, now);
            let record = self.store.write_through(record).await?;
            info!(record_id = %record.id, "demoted record to manager-only");
            summary.demoted += 1;
            self.events
                .publish(VaultEvent::DataMovedToManager(Box::new(record)));
        }

        // Phase 2: purge
        for record in self.store.load_partition(Location::Manager).await? {
            if !ExpirationCalculator::is_expired(&record, Location::Manager, now) {
                continue;
            }
            if offline_guarded(&record, online, &self.policy, now) {
                debug!(record_id = %record.id, "offline guard kept expired manager record");
                summary.offline_protected += 1;
                continue;
            }
            if self.store.remove_everywhere(record.id).await? {
                info!(record_id = %record.id, "purged expired record");
                summary.purged += 1;
            } else {
                warn!(record_id = %record.id, "expired record vanished before purge");
            }
        }

        // Phase 3: housekeeping
        for mut record in self.store.load_union().await? {
            let removed = housekeep(&mut record, &self.policy, now);
            if removed.changed() {
                debug!(
                    record_id = %record.id,
                    images = removed.images,
                    audit_entries = removed.audit_entries,
                    "pruned stale record data"
                );
                summary.images_pruned += removed.images;
                summary.audit_entries_pruned += removed.audit_entries;
                self.store.write_through(record).await?;
            }
        }

        summary.cleaned_count = summary.demoted + summary.purged;
        Ok(summary)
    }
}
