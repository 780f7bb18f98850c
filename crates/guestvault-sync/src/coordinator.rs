//! Per-record sync state machine
//!
//! ```text
//! pending ──push──▶ syncing ──ok──▶ synced
//!    ▲                 │
//!    └──retry timer── failed
//! ```
//!
//! "syncing" lives only in memory as the in-flight set; the persisted status
//! stays pending or failed until the remote answers. The store write lock is
//! released for the duration of the remote call, so the record can change
//! underneath an attempt. When it does, the newer local state wins and a
//! fresh attempt is scheduled.
//!
//! Debounce and retry timers are tracked per record. Scheduling a record that
//! already has a timer replaces it, so rapid edits collapse into one push.

use guestvault_core::{
    AccessLevel, ActorId, AuditAction, AuditEntry, Connectivity, DataLocation, EventBus,
    GuestRecord, Location, RecordId, RemoteSyncEffects, SyncConfiguration, SyncStatus,
    TimeSource, VaultError, VaultEvent,
};
use guestvault_store::{AuditTrail, PartitionedStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::BackoffPolicy;

// =============================================================================
// Outcomes
// =============================================================================

/// Why an attempt did not reach the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Engine is offline
    Offline,
    /// Another attempt for the record is running
    InFlight,
    /// Record no longer exists
    NotFound,
    /// Record is already synced
    AlreadySynced,
    /// Record may not be synced under the current configuration
    NotEligible,
}

/// Result of one sync attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote accepted the record
    Synced,
    /// Remote rejected the record
    Failed {
        /// Consecutive failures so far
        retry_count: u32,
        /// Delay before the automatic retry, if one was scheduled
        next_retry: Option<Duration>,
    },
    /// Record changed while the push was in flight; a new attempt is scheduled
    Superseded,
    /// Nothing was pushed
    Skipped(SkipReason),
}

/// Totals from one full pending-sync sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSweepReport {
    /// Records an attempt was made for
    pub attempted: usize,
    /// Records the remote accepted
    pub synced: usize,
    /// Records the remote rejected
    pub failed: usize,
    /// Records skipped or superseded
    pub skipped: usize,
}

// =============================================================================
// Timers
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Debounce,
    Retry,
}

struct ScheduledTimer {
    generation: u64,
    kind: TimerKind,
    handle: JoinHandle<()>,
}

/// Removes a record from the in-flight set when an attempt ends
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<RecordId>>,
    id: RecordId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

/// Clears the sweep flag when a sweep ends
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Coordinator
// =============================================================================

struct Inner {
    config: SyncConfiguration,
    backoff: BackoffPolicy,
    store: PartitionedStore,
    remote: Arc<dyn RemoteSyncEffects>,
    clock: Arc<dyn TimeSource>,
    connectivity: Connectivity,
    events: EventBus,
    trail: AuditTrail,
    in_flight: Mutex<HashSet<RecordId>>,
    timers: Mutex<HashMap<RecordId, ScheduledTimer>>,
    next_generation: AtomicU64,
    sweeping: AtomicBool,
    shut_down: AtomicBool,
}

/// Drives records from pending to synced
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    /// Create a coordinator
    pub fn new(
        config: SyncConfiguration,
        store: PartitionedStore,
        remote: Arc<dyn RemoteSyncEffects>,
        clock: Arc<dyn TimeSource>,
        connectivity: Connectivity,
        events: EventBus,
        trail: AuditTrail,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backoff: BackoffPolicy::from_config(&config),
                config,
                store,
                remote,
                clock,
                connectivity,
                events,
                trail,
                in_flight: Mutex::new(HashSet::new()),
                timers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                sweeping: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &SyncConfiguration {
        &self.inner.config
    }

    /// Backoff policy in effect
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.inner.backoff
    }

    /// Whether the record may be pushed under the current configuration
    pub fn can_sync(&self, record: &GuestRecord) -> bool {
        if record.is_marked_for_deletion {
            return false;
        }
        let shared = record.access_level == AccessLevel::SharedAccess;
        let config = &self.inner.config;
        if config.sync_only_with_permission && !shared && record.permissions.require_manager_approval
        {
            return false;
        }
        if config.require_manager_approval_for_sync && !shared {
            return false;
        }
        true
    }

    /// Schedule a debounced attempt; returns whether anything was scheduled
    pub fn schedule_sync(&self, record: &GuestRecord) -> bool {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return false;
        }
        if !self.can_sync(record) {
            debug!(record_id = %record.id, "record not eligible for sync");
            return false;
        }
        self.schedule_after(record.id, self.inner.config.debounce(), TimerKind::Debounce)
    }

    /// Drop any pending timer for a record
    pub fn cancel(&self, id: RecordId) {
        if let Some(timer) = self.inner.timers.lock().remove(&id) {
            timer.handle.abort();
            debug!(record_id = %id, kind = ?timer.kind, "cancelled sync timer");
        }
    }

    /// Number of records with a pending debounce or retry timer
    pub fn scheduled_count(&self) -> usize {
        self.inner.timers.lock().len()
    }

    /// Whether a retry (as opposed to a debounce) is pending for the record
    pub fn retry_pending(&self, id: RecordId) -> bool {
        self.inner
            .timers
            .lock()
            .get(&id)
            .is_some_and(|timer| timer.kind == TimerKind::Retry)
    }

    /// Whether an attempt for the record is running
    pub fn is_in_flight(&self, id: RecordId) -> bool {
        self.inner.in_flight.lock().contains(&id)
    }

    /// Returns false once the coordinator is shut down.
    fn schedule_after(&self, id: RecordId, delay: Duration, kind: TimerKind) -> bool {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        // Hold the map lock across spawn + insert so the timer cannot look
        // itself up before it is registered. `shutdown` sets its flag before
        // draining this map, so checking under the lock closes the race.
        let mut timers = self.inner.timers.lock();
        if self.inner.shut_down.load(Ordering::Acquire) {
            debug!(record_id = %id, ?kind, "coordinator shut down, not scheduling");
            return false;
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut timers = inner.timers.lock();
                if !timers.get(&id).is_some_and(|t| t.generation == generation) {
                    // replaced or cancelled while the abort was in transit
                    return;
                }
                timers.remove(&id);
            }
            let coordinator = SyncCoordinator { inner };
            if let Err(e) = coordinator.perform_sync(id).await {
                error!(record_id = %id, error = %e, "scheduled sync failed");
            }
        });
        if let Some(previous) = timers.insert(
            id,
            ScheduledTimer {
                generation,
                kind,
                handle,
            },
        ) {
            previous.handle.abort();
        }
        debug!(record_id = %id, ?kind, delay_ms = delay.as_millis() as u64, "scheduled sync");
        true
    }

    /// Attempt to push one record now.
    ///
    /// Skips (without audit entries or events) when offline, already in
    /// flight, missing, already synced, or no longer eligible.
    pub async fn perform_sync(&self, id: RecordId) -> Result<SyncOutcome, VaultError> {
        let inner = &self.inner;
        if !inner.connectivity.is_online() {
            debug!(record_id = %id, "offline, deferring sync");
            return Ok(SyncOutcome::Skipped(SkipReason::Offline));
        }
        if !inner.in_flight.lock().insert(id) {
            return Ok(SyncOutcome::Skipped(SkipReason::InFlight));
        }
        let _flight = InFlightGuard {
            set: &inner.in_flight,
            id,
        };

        let snapshot = {
            let _guard = inner.store.lock().await;
            inner.store.find(id).await?
        };
        let Some(snapshot) = snapshot else {
            return Ok(SyncOutcome::Skipped(SkipReason::NotFound));
        };
        if snapshot.sync_status == SyncStatus::Synced {
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadySynced));
        }
        if !self.can_sync(&snapshot) {
            return Ok(SyncOutcome::Skipped(SkipReason::NotEligible));
        }

        let pushed = inner.remote.push_record(&snapshot).await;

        let guard = inner.store.lock().await;
        let Some(mut current) = inner.store.find(id).await? else {
            debug!(record_id = %id, "record removed during sync");
            return Ok(SyncOutcome::Skipped(SkipReason::NotFound));
        };

        if current.last_modified_at != snapshot.last_modified_at {
            drop(guard);
            info!(record_id = %id, "record changed during sync, keeping newer state");
            self.schedule_after(id, inner.config.debounce(), TimerKind::Debounce);
            return Ok(SyncOutcome::Superseded);
        }

        let now = inner.clock.now();
        let location = audit_location(&current);
        match pushed {
            Ok(()) => {
                current.sync_status = SyncStatus::Synced;
                current.sync_retry_count = 0;
                current.last_synced_at = Some(now);
                current.last_sync_error = None;
                inner.trail.record(
                    &mut current,
                    AuditEntry::new(now, ActorId::sync(), AuditAction::Sync, location),
                );
                let current = inner.store.write_through(current).await?;
                drop(guard);

                info!(record_id = %id, "record synced");
                inner.events.publish(VaultEvent::DataSynced(Box::new(current)));
                Ok(SyncOutcome::Synced)
            }
            Err(e) => {
                current.sync_retry_count = current.sync_retry_count.saturating_add(1);
                current.sync_status = SyncStatus::Failed;
                current.last_sync_error = Some(e.to_string());
                inner.trail.record(
                    &mut current,
                    AuditEntry::new(now, ActorId::sync(), AuditAction::Sync, location)
                        .failed()
                        .with_details(e.to_string()),
                );
                let retry_count = current.sync_retry_count;
                inner.store.write_through(current).await?;
                drop(guard);

                let next_retry = inner.backoff.next_retry(retry_count);
                match next_retry {
                    Some(delay) => {
                        warn!(
                            record_id = %id,
                            retry_count,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "sync failed, retrying"
                        );
                        self.schedule_after(id, delay, TimerKind::Retry);
                    }
                    None => warn!(
                        record_id = %id,
                        retry_count,
                        error = %e,
                        "sync failed, retries exhausted until next sweep"
                    ),
                }
                Ok(SyncOutcome::Failed {
                    retry_count,
                    next_retry,
                })
            }
        }
    }

    /// Re-attempt every pending or failed record.
    ///
    /// Offline-created records go first when `prioritize_offline_data` is set.
    /// Returns `Ok(None)` when another sweep is already running.
    pub async fn sync_all_pending(&self) -> Result<Option<SyncSweepReport>, VaultError> {
        let inner = &self.inner;
        if inner
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("pending-sync sweep already running, skipping");
            return Ok(None);
        }
        let _sweeping = SweepGuard(&inner.sweeping);

        let mut report = SyncSweepReport::default();
        if !inner.connectivity.is_online() {
            debug!("offline, skipping pending-sync sweep");
            return Ok(Some(report));
        }

        let mut queue: Vec<GuestRecord> = {
            let _guard = inner.store.lock().await;
            inner.store.load_union().await?
        };
        queue.retain(|record| record.sync_status.needs_sync() && self.can_sync(record));
        if inner.config.prioritize_offline_data {
            queue.sort_by_key(|record| (!record.offline_created, record.created_at));
        } else {
            queue.sort_by_key(|record| record.created_at);
        }

        for record in queue {
            report.attempted += 1;
            match self.perform_sync(record.id).await? {
                SyncOutcome::Synced => report.synced += 1,
                SyncOutcome::Failed { .. } => report.failed += 1,
                SyncOutcome::Superseded | SyncOutcome::Skipped(_) => report.skipped += 1,
            }
        }

        info!(
            attempted = report.attempted,
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped,
            "pending-sync sweep finished"
        );
        Ok(Some(report))
    }

    /// Sweep pending records on every offline → online transition.
    ///
    /// Runs until the connectivity signal is dropped; callers cancel it
    /// through their task registry.
    pub async fn follow_connectivity(&self) {
        let mut rx = self.inner.connectivity.subscribe();
        let mut was_online = *rx.borrow_and_update();
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online && !was_online {
                info!("back online, syncing pending records");
                if let Err(e) = self.sync_all_pending().await {
                    error!(error = %e, "pending-sync sweep after reconnect failed");
                }
            }
            was_online = online;
        }
    }

    /// Cancel every timer and refuse new schedules
    pub fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::Release);
        let timers: Vec<_> = self.inner.timers.lock().drain().collect();
        for (_, timer) in &timers {
            timer.handle.abort();
        }
        info!(cancelled = timers.len(), "sync coordinator shut down");
    }
}

/// Partition a system sync entry is attributed to
fn audit_location(record: &GuestRecord) -> Location {
    match record.data_source {
        DataLocation::Manager => Location::Manager,
        DataLocation::Reception | DataLocation::Both => Location::Reception,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestvault_core::Permissions;
    use guestvault_store::MemoryRecordStore;
    use guestvault_testkit::{test_clock, test_start, RecordBuilder, ScriptedRemote};

    fn coordinator(config: SyncConfiguration) -> SyncCoordinator {
        let clock = test_clock();
        SyncCoordinator::new(
            config,
            PartitionedStore::new(Arc::new(MemoryRecordStore::new())),
            Arc::new(ScriptedRemote::succeeding()),
            Arc::new(clock),
            Connectivity::online(),
            EventBus::default(),
            AuditTrail::default(),
        )
    }

    #[test]
    fn eligibility_rules() {
        let approval = Permissions {
            require_manager_approval: true,
            ..Permissions::default()
        };
        let reception = RecordBuilder::new(test_start())
            .permissions(approval.clone())
            .build();
        let shared = RecordBuilder::new(test_start())
            .access_level(AccessLevel::SharedAccess)
            .permissions(approval)
            .build();
        let plain = RecordBuilder::new(test_start()).build();
        let deleted = RecordBuilder::new(test_start())
            .access_level(AccessLevel::SharedAccess)
            .marked_for_deletion()
            .build();

        let default = coordinator(SyncConfiguration::default());
        assert!(!default.can_sync(&reception));
        assert!(default.can_sync(&shared));
        assert!(default.can_sync(&plain));
        assert!(!default.can_sync(&deleted));

        let strict = coordinator(SyncConfiguration {
            require_manager_approval_for_sync: true,
            ..SyncConfiguration::default()
        });
        assert!(!strict.can_sync(&plain));
        assert!(strict.can_sync(&shared));

        let permissive = coordinator(SyncConfiguration {
            sync_only_with_permission: false,
            ..SyncConfiguration::default()
        });
        assert!(permissive.can_sync(&reception));
    }

    #[test]
    fn audit_location_follows_origin() {
        let record = RecordBuilder::new(test_start())
            .created_at_location(Location::Manager)
            .build();
        assert_eq!(audit_location(&record), Location::Manager);
        let record = RecordBuilder::new(test_start()).build();
        assert_eq!(audit_location(&record), Location::Reception);
    }
}
