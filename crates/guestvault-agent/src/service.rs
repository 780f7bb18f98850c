//! Guest data service
//!
//! Composes access control, expiry derivation, placement-aware storage, the
//! audit trail, retention, and sync behind one API. Every call names the
//! partition it is made from; permission changes are always manager-side.
//!
//! Load-modify-store sequences run under the store write lock. Events are
//! published and sync is scheduled after the lock is released.

use chrono::{DateTime, Utc};
use guestvault_authorization::{AccessControlEvaluator, ExpirationCalculator};
use guestvault_core::{
    AccessAction, AccessLevel, AccessOutcome, ActorId, AuditAction, AuditEntry, CleanupSummary,
    Connectivity, DenialReason, EventBus, GuestRecord, GuestRecordPatch, Location, NewGuestRecord,
    Permissions, RecordId, RecordStore, RemoteSyncEffects, SyncStatus, TimeSource, VaultConfig,
    VaultError, VaultEvent,
};
use guestvault_maintenance::{demote_to_manager, offline_guarded, RetentionSweeper};
use guestvault_store::{AuditTrail, PartitionedStore};
use guestvault_sync::{SyncCoordinator, SyncSweepReport};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::runtime::RuntimeTaskRegistry;
use crate::{DataStatistics, GuestDataServiceBuilder};

// =============================================================================
// Lifecycle
// =============================================================================

/// Background task state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Background tasks are not running
    Stopped,
    /// Background tasks are being spawned
    Starting,
    /// Background tasks are running
    Running,
    /// Shut down for good
    ShutDown,
}

/// What a permitted delete did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed from every partition
    Removed,
    /// Flagged for a manager decision
    MarkedForDeletion,
}

// =============================================================================
// Service
// =============================================================================

/// Permission-scoped guest data store
pub struct GuestDataService {
    config: VaultConfig,
    store: PartitionedStore,
    evaluator: AccessControlEvaluator,
    expiration: ExpirationCalculator,
    trail: AuditTrail,
    sweeper: RetentionSweeper,
    sync: SyncCoordinator,
    clock: Arc<dyn TimeSource>,
    connectivity: Connectivity,
    events: EventBus,
    tasks: RuntimeTaskRegistry,
    state: RwLock<ServiceState>,
}

impl GuestDataService {
    /// Start building a service
    pub fn builder() -> GuestDataServiceBuilder {
        GuestDataServiceBuilder::new()
    }

    pub(crate) fn assemble(
        config: VaultConfig,
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteSyncEffects>,
        clock: Arc<dyn TimeSource>,
        connectivity: Connectivity,
        events: EventBus,
    ) -> Self {
        let store = PartitionedStore::new(store);
        let trail = AuditTrail::new(config.storage.audit_history_limit);
        let sweeper = RetentionSweeper::new(
            store.clone(),
            config.retention.clone(),
            clock.clone(),
            connectivity.clone(),
            events.clone(),
        )
        .with_audit_trail(trail);
        let sync = SyncCoordinator::new(
            config.sync.clone(),
            store.clone(),
            remote,
            clock.clone(),
            connectivity.clone(),
            events.clone(),
            trail,
        );

        Self {
            expiration: ExpirationCalculator::new(config.retention.clone()),
            evaluator: AccessControlEvaluator::new(),
            config,
            store,
            trail,
            sweeper,
            sync,
            clock,
            connectivity,
            events,
            tasks: RuntimeTaskRegistry::new(),
            state: RwLock::new(ServiceState::Stopped),
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Connectivity signal shared with the host
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Sync coordinator
    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    /// Retention sweeper
    pub fn sweeper(&self) -> &RetentionSweeper {
        &self.sweeper
    }

    /// Event bus
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to domain events
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        *self.state.read()
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Create a record from `location`.
    ///
    /// Expiries come from the retention policy and the reception permissions.
    /// The record is marked offline-created when the engine is offline.
    pub async fn save(
        &self,
        data: NewGuestRecord,
        created_by: &ActorId,
        location: Location,
    ) -> Result<GuestRecord, VaultError> {
        if data.personal.full_name.trim().is_empty() {
            return Err(VaultError::invalid("guest full name is required"));
        }

        let now = self.clock.now();
        let access_level = data.access_level;
        let (expires_at, reception_access_expires_at) =
            self.expiration
                .expiries_for(access_level, &data.permissions, now)?;
        let offline_created = !self.connectivity.is_online();

        let mut record = GuestRecord {
            id: RecordId::new(),
            user_id: data.user_id,
            personal: data.personal,
            access_level,
            permissions: data.permissions,
            created_at: now,
            expires_at,
            last_accessed_at: now,
            reception_access_expires_at,
            sync_status: SyncStatus::Pending,
            offline_created,
            sync_retry_count: 0,
            last_synced_at: None,
            last_sync_error: None,
            created_by: created_by.clone(),
            last_modified_by: created_by.clone(),
            last_modified_at: now,
            access_history: Vec::new(),
            data_source: location.into(),
            current_location: location.into(),
            is_marked_for_deletion: false,
        };
        self.trail.record(
            &mut record,
            AuditEntry::new(now, created_by.clone(), AuditAction::Create, location)
                .with_details(format!("created as {access_level:?}")),
        );

        let record = {
            let _guard = self.store.lock().await;
            self.store.write_through(record).await?
        };

        info!(
            record_id = %record.id,
            %location,
            access_level = ?record.access_level,
            offline_created,
            "guest record saved"
        );
        self.sync.schedule_sync(&record);
        self.events
            .publish(VaultEvent::UserDataSaved(Box::new(record.clone())));
        Ok(record)
    }

    /// Read a record from `location`.
    ///
    /// A record whose reception window has closed is demoted to manager-only
    /// on the spot, unless the offline guard protects it, and the read is
    /// denied as expired.
    pub async fn get(
        &self,
        id: RecordId,
        actor: &ActorId,
        location: Location,
    ) -> Result<AccessOutcome<GuestRecord>, VaultError> {
        let guard = self.store.lock().await;
        let Some(mut record) = self.store.find_in(id, location).await? else {
            return Ok(AccessOutcome::NotFound);
        };

        let now = self.clock.now();
        let decision = self
            .evaluator
            .decide(&record, location, AccessAction::View, now);
        if !decision.allowed {
            let denial = decision.denial.unwrap_or(DenialReason::Forbidden);
            warn!(
                record_id = %id,
                actor = %actor,
                %location,
                reason = %decision.reason,
                "read denied"
            );
            if denial == DenialReason::Expired && location == Location::Reception {
                let demoted = self.demote_inline(record, now).await?;
                drop(guard);
                if let Some(demoted) = demoted {
                    self.events
                        .publish(VaultEvent::DataMovedToManager(Box::new(demoted)));
                }
            }
            return Ok(AccessOutcome::Denied(denial));
        }

        record.last_accessed_at = now;
        self.trail.record(
            &mut record,
            AuditEntry::new(now, actor.clone(), AuditAction::View, location),
        );
        let record = self.store.write_through(record).await?;
        drop(guard);

        debug!(record_id = %id, actor = %actor, %location, "guest record read");
        Ok(AccessOutcome::Granted(record))
    }

    /// Demote an expired reception record; `None` when the offline guard
    /// keeps it in place. Caller holds the store lock.
    async fn demote_inline(
        &self,
        mut record: GuestRecord,
        now: DateTime<Utc>,
    ) -> Result<Option<GuestRecord>, VaultError> {
        if offline_guarded(
            &record,
            self.connectivity.is_online(),
            &self.config.retention,
            now,
        ) {
            debug!(record_id = %record.id, "offline guard kept expired reception record");
            return Ok(None);
        }
        demote_to_manager(&mut record, &self.config.retention, &self.trail, now);
        let record = self.store.write_through(record).await?;
        info!(record_id = %record.id, "demoted record to manager-only on read");
        Ok(Some(record))
    }

    /// Apply field changes from `location`.
    ///
    /// The record goes back to pending with a fresh retry budget and a new
    /// sync attempt is scheduled.
    pub async fn update(
        &self,
        id: RecordId,
        patch: GuestRecordPatch,
        actor: &ActorId,
        location: Location,
    ) -> Result<AccessOutcome<GuestRecord>, VaultError> {
        if patch.is_empty() {
            return Err(VaultError::invalid("update changes no fields"));
        }

        let record = {
            let _guard = self.store.lock().await;
            let Some(mut record) = self.store.find_in(id, location).await? else {
                return Ok(AccessOutcome::NotFound);
            };

            let now = self.clock.now();
            let decision = self
                .evaluator
                .decide(&record, location, AccessAction::Update, now);
            if !decision.allowed {
                warn!(
                    record_id = %id,
                    actor = %actor,
                    %location,
                    reason = %decision.reason,
                    "update denied"
                );
                return Ok(AccessOutcome::Denied(
                    decision.denial.unwrap_or(DenialReason::Forbidden),
                ));
            }

            let changed = patch.apply_to(&mut record);
            record.touch(actor, now);
            record.sync_status = SyncStatus::Pending;
            record.sync_retry_count = 0;
            record.last_sync_error = None;
            self.trail.record(
                &mut record,
                AuditEntry::new(now, actor.clone(), AuditAction::Update, location)
                    .with_details(changed.join(", ")),
            );
            self.store.write_through(record).await?
        };

        info!(record_id = %id, actor = %actor, %location, "guest record updated");
        self.sync.schedule_sync(&record);
        self.events
            .publish(VaultEvent::UserDataUpdated(Box::new(record.clone())));
        Ok(AccessOutcome::Granted(record))
    }

    /// Replace the reception permissions of a record.
    ///
    /// Granting reception access makes the record shared; revoking it makes
    /// the record manager-only and drops the reception copy. Returns false
    /// when no such record exists.
    pub async fn set_reception_permissions(
        &self,
        id: RecordId,
        permissions: Permissions,
        manager: &ActorId,
    ) -> Result<bool, VaultError> {
        let record = {
            let _guard = self.store.lock().await;
            let Some(mut record) = self.store.find(id).await? else {
                warn!(record_id = %id, manager = %manager, "permission change for unknown record");
                return Ok(false);
            };

            let now = self.clock.now();
            let reception_expiry = self.expiration.reception_expiry_for(&permissions, now)?;
            let previous = record.access_level;
            record.access_level = if permissions.allow_reception_access {
                AccessLevel::SharedAccess
            } else {
                AccessLevel::ManagerOnly
            };
            record.reception_access_expires_at = ExpirationCalculator::clamp_reception_expiry(
                reception_expiry,
                record.expires_at,
            );
            let details = format!(
                "reception permissions changed: access={} modify={} delete={}, {previous:?} -> {:?}",
                permissions.allow_reception_access,
                permissions.allow_reception_modify,
                permissions.allow_reception_delete,
                record.access_level,
            );
            record.permissions = permissions;
            record.touch(manager, now);
            record.sync_status = SyncStatus::Pending;
            record.sync_retry_count = 0;
            self.trail.record(
                &mut record,
                AuditEntry::new(now, manager.clone(), AuditAction::Update, Location::Manager)
                    .with_details(details),
            );
            self.store.write_through(record).await?
        };

        info!(
            record_id = %id,
            manager = %manager,
            access_level = ?record.access_level,
            location = ?record.current_location,
            "reception permissions updated"
        );
        self.sync.schedule_sync(&record);
        self.events
            .publish(VaultEvent::PermissionsUpdated(Box::new(record)));
        Ok(true)
    }

    /// Delete a record from `location`.
    ///
    /// Reception deletes of records that require manager approval only flag
    /// the record; everything else removes it from both partitions.
    pub async fn delete(
        &self,
        id: RecordId,
        actor: &ActorId,
        location: Location,
    ) -> Result<AccessOutcome<DeleteOutcome>, VaultError> {
        let outcome = {
            let _guard = self.store.lock().await;
            let Some(mut record) = self.store.find_in(id, location).await? else {
                return Ok(AccessOutcome::NotFound);
            };

            let now = self.clock.now();
            let decision = self
                .evaluator
                .decide(&record, location, AccessAction::Delete, now);
            if !decision.allowed {
                warn!(
                    record_id = %id,
                    actor = %actor,
                    %location,
                    reason = %decision.reason,
                    "delete denied"
                );
                return Ok(AccessOutcome::Denied(
                    decision.denial.unwrap_or(DenialReason::Forbidden),
                ));
            }

            if location == Location::Manager || !record.permissions.require_manager_approval {
                self.store.remove_everywhere(id).await?;
                DeleteOutcome::Removed
            } else {
                record.is_marked_for_deletion = true;
                record.touch(actor, now);
                self.trail.record(
                    &mut record,
                    AuditEntry::new(now, actor.clone(), AuditAction::Delete, location)
                        .with_details("awaiting manager approval"),
                );
                self.store.write_through(record).await?;
                DeleteOutcome::MarkedForDeletion
            }
        };

        self.sync.cancel(id);
        let pending_approval = outcome == DeleteOutcome::MarkedForDeletion;
        info!(record_id = %id, actor = %actor, %location, pending_approval, "guest record deleted");
        self.events.publish(VaultEvent::UserDataDeleted {
            id,
            pending_approval,
        });
        Ok(AccessOutcome::Granted(outcome))
    }

    /// Records `location` may currently view
    pub async fn get_all(
        &self,
        location: Location,
        actor: &ActorId,
    ) -> Result<Vec<GuestRecord>, VaultError> {
        let records = {
            let _guard = self.store.lock().await;
            self.store.load_partition(location).await?
        };
        let now = self.clock.now();
        let held = records.len();
        let visible: Vec<_> = records
            .into_iter()
            .filter(|record| {
                self.evaluator
                    .check_access(record, location, AccessAction::View, now)
            })
            .collect();
        debug!(
            actor = %actor,
            %location,
            held,
            visible = visible.len(),
            "listed guest records"
        );
        Ok(visible)
    }

    /// Aggregate counts for one partition
    pub async fn get_statistics(&self, location: Location) -> Result<DataStatistics, VaultError> {
        let (records, last_written) = {
            let _guard = self.store.lock().await;
            let records = self.store.load_partition(location).await?;
            let last_written = self.store.inner().last_written(location).await?;
            (records, last_written)
        };
        Ok(DataStatistics::collect(
            location,
            &records,
            self.clock.now(),
            last_written,
        ))
    }

    // =========================================================================
    // Operator hooks
    // =========================================================================

    /// Run one retention sweep now; `None` when a sweep was already running
    pub async fn run_retention_sweep(&self) -> Result<Option<CleanupSummary>, VaultError> {
        self.sweeper.run_once().await
    }

    /// Push every pending record now; `None` when a sweep was already running
    pub async fn sync_all_pending(&self) -> Result<Option<SyncSweepReport>, VaultError> {
        self.sync.sync_all_pending().await
    }

    /// Report connectivity; returns true on an offline → online transition.
    ///
    /// While the service is running the connectivity watcher follows a
    /// reconnect with a pending-sync sweep.
    pub fn set_online(&self, online: bool) -> bool {
        self.connectivity.set_online(online)
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    /// Spawn the retention timer, the pending-sync timer, and the
    /// connectivity watcher. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), VaultError> {
        {
            let mut state = self.state.write();
            if *state != ServiceState::Stopped {
                return Err(VaultError::invalid(format!(
                    "cannot start service in state {:?}",
                    *state
                )));
            }
            *state = ServiceState::Starting;
        }

        let retention = &self.config.retention;
        if retention.auto_cleanup_enabled {
            let sweeper = self.sweeper.clone();
            self.tasks
                .spawn_interval_until(retention.cleanup_interval(), move || {
                    let sweeper = sweeper.clone();
                    async move {
                        if let Err(e) = sweeper.run_once().await {
                            warn!(error = %e, "scheduled retention sweep failed");
                        }
                        true
                    }
                });
        }

        let sync = self.sync.clone();
        self.tasks
            .spawn_interval_until(self.config.sync.auto_sync_interval(), move || {
                let sync = sync.clone();
                async move {
                    if let Err(e) = sync.sync_all_pending().await {
                        warn!(error = %e, "scheduled pending-sync sweep failed");
                    }
                    true
                }
            });

        let sync = self.sync.clone();
        self.tasks
            .spawn_cancellable(async move { sync.follow_connectivity().await });

        *self.state.write() = ServiceState::Running;
        info!(
            tasks = self.tasks.task_count(),
            auto_cleanup = retention.auto_cleanup_enabled,
            "guest data service started"
        );
        Ok(())
    }

    /// Stop every background task and pending sync timer
    pub fn shutdown(&self) {
        {
            let mut state = self.state.write();
            if *state == ServiceState::ShutDown {
                return;
            }
            *state = ServiceState::ShutDown;
        }
        self.tasks.shutdown();
        self.sync.shutdown();
        info!("guest data service shut down");
    }
}
