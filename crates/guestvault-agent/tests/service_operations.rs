//! End-to-end behavior of the guest data service over an in-memory store

use chrono::Duration;
use guestvault_agent::{DeleteOutcome, GuestDataService};
use guestvault_core::{
    AccessLevel, AccessOutcome, AuditAction, DataLocation, DenialReason, GuestRecord,
    GuestRecordPatch, Location, NewGuestRecord, Permissions, RecordStore, SimulatedClock,
    SyncStatus, TimeSource, VaultConfig, VaultError, VaultEvent,
};
use guestvault_store::MemoryRecordStore;
use guestvault_testkit::{
    manager_actor, new_guest, reception_actor, test_clock, test_start, FlakyStore, GatedRemote,
    ScriptedRemote,
};
use std::sync::Arc;
use tokio::sync::broadcast;

struct Harness {
    clock: SimulatedClock,
    memory: Arc<MemoryRecordStore>,
    remote: ScriptedRemote,
    service: GuestDataService,
}

fn harness_with(remote: ScriptedRemote, config: VaultConfig) -> Harness {
    let clock = test_clock();
    let memory = Arc::new(MemoryRecordStore::with_clock(Arc::new(clock.clone())));
    let service = GuestDataService::builder()
        .with_config(config)
        .with_store(memory.clone())
        .with_remote(Arc::new(remote.clone()))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    Harness {
        clock,
        memory,
        remote,
        service,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedRemote::succeeding(), VaultConfig::default())
}

fn topics(rx: &mut broadcast::Receiver<VaultEvent>) -> Vec<&'static str> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event.topic());
    }
    seen
}

async fn held_at(h: &Harness, record: &GuestRecord, partition: Location) -> Option<GuestRecord> {
    h.memory.load(record.id, partition).await.unwrap()
}

fn guest_with(level: AccessLevel, permissions: Permissions) -> NewGuestRecord {
    NewGuestRecord {
        permissions,
        ..new_guest(level)
    }
}

// ============================================================================
// Save and read
// ============================================================================

#[tokio::test(start_paused = true)]
async fn save_derives_expiries_and_placement() {
    let h = harness();
    let mut rx = h.service.subscribe();

    let record = h
        .service
        .save(
            new_guest(AccessLevel::ReceptionTemporary),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    assert_eq!(record.expires_at, Some(test_start() + Duration::hours(24)));
    assert_eq!(
        record.reception_access_expires_at,
        Some(test_start() + Duration::hours(24))
    );
    assert_eq!(record.sync_status, SyncStatus::Pending);
    assert!(!record.offline_created);
    assert_eq!(record.current_location, DataLocation::Reception);
    assert_eq!(record.access_history.len(), 1);
    assert_eq!(record.access_history[0].action, AuditAction::Create);
    assert_eq!(
        record.access_history[0].details.as_deref(),
        Some("created as ReceptionTemporary")
    );

    assert!(held_at(&h, &record, Location::Reception).await.is_some());
    assert!(held_at(&h, &record, Location::Manager).await.is_none());
    assert_eq!(topics(&mut rx), vec!["userData:saved"]);
    assert_eq!(h.service.sync().scheduled_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn shared_records_land_in_both_partitions() {
    let h = harness();
    let record = h
        .service
        .save(
            new_guest(AccessLevel::SharedAccess),
            &manager_actor(),
            Location::Manager,
        )
        .await
        .unwrap();

    assert_eq!(record.current_location, DataLocation::Both);
    for partition in Location::ALL {
        assert_eq!(held_at(&h, &record, partition).await.unwrap(), record);
    }
}

#[tokio::test(start_paused = true)]
async fn blank_name_is_rejected() {
    let h = harness();
    let mut input = new_guest(AccessLevel::ReceptionOnly);
    input.personal.full_name = "   ".to_string();

    let err = h
        .service
        .save(input, &reception_actor(), Location::Reception)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("full name"));
    assert_eq!(h.memory.len(Location::Reception).await, 0);
}

#[tokio::test(start_paused = true)]
async fn read_returns_saved_record_with_view_entry() {
    let h = harness();
    let saved = h
        .service
        .save(
            new_guest(AccessLevel::ReceptionOnly),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(5));

    let mut read = h
        .service
        .get(saved.id, &reception_actor(), Location::Reception)
        .await
        .unwrap()
        .granted()
        .unwrap();

    assert_eq!(read.last_accessed_at, h.clock.now());
    assert_eq!(read.access_history.len(), saved.access_history.len() + 1);
    let view = read.access_history.last().unwrap();
    assert_eq!(view.action, AuditAction::View);
    assert_eq!(view.actor, reception_actor());

    read.access_history.pop();
    read.last_accessed_at = saved.last_accessed_at;
    assert_eq!(read, saved);
}

#[tokio::test(start_paused = true)]
async fn reception_cannot_read_manager_only_records() {
    let h = harness();
    let record = h
        .service
        .save(
            guest_with(AccessLevel::ManagerOnly, Permissions::manager_only()),
            &manager_actor(),
            Location::Manager,
        )
        .await
        .unwrap();

    let outcome = h
        .service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::NotFound);

    let outcome = h
        .service
        .get(record.id, &manager_actor(), Location::Manager)
        .await
        .unwrap();
    assert!(outcome.is_granted());
}

// ============================================================================
// Expiry on read
// ============================================================================

#[tokio::test(start_paused = true)]
async fn temporary_record_is_demoted_when_read_after_window() {
    let h = harness();
    let mut rx = h.service.subscribe();
    let record = h
        .service
        .save(
            new_guest(AccessLevel::ReceptionTemporary),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    h.clock.advance_hours(23);
    let outcome = h
        .service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert!(outcome.is_granted());

    h.clock.advance_hours(2);
    let outcome = h
        .service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::Denied(DenialReason::Expired));

    assert!(held_at(&h, &record, Location::Reception).await.is_none());
    let demoted = held_at(&h, &record, Location::Manager).await.unwrap();
    assert_eq!(demoted.access_level, AccessLevel::ManagerOnly);
    assert_eq!(demoted.reception_access_expires_at, None);
    assert_eq!(demoted.expires_at, Some(h.clock.now() + Duration::days(365)));

    assert_eq!(
        topics(&mut rx),
        vec!["userData:saved", "data:movedToManager"]
    );

    let outcome = h
        .service
        .get(record.id, &manager_actor(), Location::Manager)
        .await
        .unwrap();
    assert!(outcome.is_granted());
}

#[tokio::test(start_paused = true)]
async fn offline_records_are_not_demoted_on_read() {
    let h = harness();
    h.service.set_online(false);
    let record = h
        .service
        .save(
            new_guest(AccessLevel::ReceptionTemporary),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();
    assert!(record.offline_created);

    h.clock.advance_days(30);
    let outcome = h
        .service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::Denied(DenialReason::Expired));
    let kept = held_at(&h, &record, Location::Reception).await.unwrap();
    assert_eq!(kept.access_level, AccessLevel::ReceptionTemporary);

    // back online, well past the grace period
    h.service.set_online(true);
    h.service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert!(held_at(&h, &record, Location::Reception).await.is_none());
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test(start_paused = true)]
async fn update_merges_fields_and_resets_sync_state() {
    let h = harness_with(ScriptedRemote::failing(), VaultConfig::default());
    let mut rx = h.service.subscribe();
    let record = h
        .service
        .save(
            new_guest(AccessLevel::ReceptionOnly),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    // let the first push fail
    tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;
    let failed = held_at(&h, &record, Location::Reception).await.unwrap();
    assert_eq!(failed.sync_status, SyncStatus::Failed);
    assert_eq!(failed.sync_retry_count, 1);

    h.clock.advance(Duration::minutes(1));
    let patch = GuestRecordPatch {
        phone: Some("+1 555 0142".to_string()),
        ..GuestRecordPatch::default()
    };
    let updated = h
        .service
        .update(record.id, patch, &reception_actor(), Location::Reception)
        .await
        .unwrap()
        .granted()
        .unwrap();

    assert_eq!(updated.personal.phone.as_deref(), Some("+1 555 0142"));
    assert_eq!(updated.sync_status, SyncStatus::Pending);
    assert_eq!(updated.sync_retry_count, 0);
    assert_eq!(updated.last_sync_error, None);
    assert_eq!(updated.last_modified_at, h.clock.now());
    let entry = updated.access_history.last().unwrap();
    assert_eq!(entry.action, AuditAction::Update);
    assert_eq!(entry.details.as_deref(), Some("phone"));

    assert_eq!(
        topics(&mut rx),
        vec!["userData:saved", "userData:updated"]
    );
    assert!(!h.service.sync().retry_pending(record.id));
    assert_eq!(h.remote.push_count(), 1);
    h.service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn update_without_modify_permission_is_denied() {
    let h = harness();
    let record = h
        .service
        .save(
            guest_with(
                AccessLevel::ReceptionOnly,
                Permissions {
                    allow_reception_modify: false,
                    ..Permissions::default()
                },
            ),
            &manager_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    let patch = GuestRecordPatch {
        email: Some("someone@else.test".to_string()),
        ..GuestRecordPatch::default()
    };
    let outcome = h
        .service
        .update(record.id, patch, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::Denied(DenialReason::Forbidden));
    assert_eq!(held_at(&h, &record, Location::Reception).await.unwrap(), record);
}

#[tokio::test(start_paused = true)]
async fn empty_update_is_rejected() {
    let h = harness();
    let record = h
        .service
        .save(
            new_guest(AccessLevel::ReceptionOnly),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    let result = h
        .service
        .update(
            record.id,
            GuestRecordPatch::default(),
            &reception_actor(),
            Location::Reception,
        )
        .await;
    assert!(result.is_err());
}

// ============================================================================
// Permissions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn granting_reception_access_shares_the_record() {
    let h = harness();
    let mut rx = h.service.subscribe();
    let record = h
        .service
        .save(
            guest_with(AccessLevel::ManagerOnly, Permissions::manager_only()),
            &manager_actor(),
            Location::Manager,
        )
        .await
        .unwrap();
    assert_eq!(record.reception_access_expires_at, None);
    h.clock.advance_hours(1);

    let changed = h
        .service
        .set_reception_permissions(
            record.id,
            Permissions {
                allow_reception_access: true,
                temporary_access_duration_hours: Some(2),
                ..Permissions::default()
            },
            &manager_actor(),
        )
        .await
        .unwrap();
    assert!(changed);

    let shared = held_at(&h, &record, Location::Reception).await.unwrap();
    assert_eq!(shared.access_level, AccessLevel::SharedAccess);
    assert_eq!(
        shared.reception_access_expires_at,
        Some(h.clock.now() + Duration::hours(2))
    );
    assert_eq!(shared.last_modified_by, manager_actor());
    assert!(held_at(&h, &record, Location::Manager).await.is_some());
    assert_eq!(
        topics(&mut rx),
        vec!["userData:saved", "permissions:updated"]
    );

    let outcome = h
        .service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert!(outcome.is_granted());
}

#[tokio::test(start_paused = true)]
async fn revoking_reception_access_removes_reception_copy() {
    let h = harness();
    let record = h
        .service
        .save(
            new_guest(AccessLevel::SharedAccess),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    assert!(h
        .service
        .set_reception_permissions(record.id, Permissions::manager_only(), &manager_actor())
        .await
        .unwrap());

    assert!(held_at(&h, &record, Location::Reception).await.is_none());
    let held = held_at(&h, &record, Location::Manager).await.unwrap();
    assert_eq!(held.access_level, AccessLevel::ManagerOnly);
    assert_eq!(held.reception_access_expires_at, None);

    let outcome = h
        .service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::NotFound);
}

#[tokio::test(start_paused = true)]
async fn reception_window_never_outlives_the_record() {
    let h = harness();
    let record = h
        .service
        .save(
            new_guest(AccessLevel::ReceptionTemporary),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    h.service
        .set_reception_permissions(
            record.id,
            Permissions {
                temporary_access_duration_hours: Some(72),
                ..Permissions::default()
            },
            &manager_actor(),
        )
        .await
        .unwrap();

    let held = held_at(&h, &record, Location::Reception).await.unwrap();
    assert_eq!(held.reception_access_expires_at, record.expires_at);
}

#[tokio::test(start_paused = true)]
async fn permission_change_for_unknown_record_reports_false() {
    let h = harness();
    let changed = h
        .service
        .set_reception_permissions(
            guestvault_core::RecordId::new(),
            Permissions::default(),
            &manager_actor(),
        )
        .await
        .unwrap();
    assert!(!changed);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test(start_paused = true)]
async fn manager_delete_removes_every_copy() {
    let h = harness();
    let mut rx = h.service.subscribe();
    let record = h
        .service
        .save(
            new_guest(AccessLevel::SharedAccess),
            &manager_actor(),
            Location::Manager,
        )
        .await
        .unwrap();

    let outcome = h
        .service
        .delete(record.id, &manager_actor(), Location::Manager)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::Granted(DeleteOutcome::Removed));
    for partition in Location::ALL {
        assert!(held_at(&h, &record, partition).await.is_none());
    }
    assert_eq!(h.service.sync().scheduled_count(), 0);
    assert_eq!(
        topics(&mut rx),
        vec!["userData:saved", "userData:deleted"]
    );
}

#[tokio::test(start_paused = true)]
async fn reception_delete_needs_permission() {
    let h = harness();
    let record = h
        .service
        .save(
            new_guest(AccessLevel::ReceptionOnly),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    let outcome = h
        .service
        .delete(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::Denied(DenialReason::Forbidden));
    assert!(held_at(&h, &record, Location::Reception).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn reception_delete_with_approval_only_flags_record() {
    let h = harness();
    let mut rx = h.service.subscribe();
    let record = h
        .service
        .save(
            guest_with(
                AccessLevel::ReceptionOnly,
                Permissions {
                    allow_reception_delete: true,
                    require_manager_approval: true,
                    ..Permissions::default()
                },
            ),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();
    let _ = topics(&mut rx);

    let outcome = h
        .service
        .delete(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        AccessOutcome::Granted(DeleteOutcome::MarkedForDeletion)
    );

    let flagged = held_at(&h, &record, Location::Reception).await.unwrap();
    assert!(flagged.is_marked_for_deletion);
    assert_eq!(
        flagged.access_history.last().unwrap().action,
        AuditAction::Delete
    );
    match rx.try_recv().unwrap() {
        VaultEvent::UserDataDeleted {
            id,
            pending_approval,
        } => {
            assert_eq!(id, record.id);
            assert!(pending_approval);
        }
        other => panic!("unexpected event {}", other.topic()),
    }
    assert!(!h.service.sync().can_sync(&flagged));
}

#[tokio::test(start_paused = true)]
async fn reception_delete_without_approval_removes_record() {
    let h = harness();
    let record = h
        .service
        .save(
            guest_with(
                AccessLevel::ReceptionOnly,
                Permissions {
                    allow_reception_delete: true,
                    ..Permissions::default()
                },
            ),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    let outcome = h
        .service
        .delete(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::Granted(DeleteOutcome::Removed));
    assert!(held_at(&h, &record, Location::Reception).await.is_none());
}

// ============================================================================
// Listings and statistics
// ============================================================================

#[tokio::test(start_paused = true)]
async fn listing_hides_expired_records() {
    let h = harness();
    let long_window = h
        .service
        .save(
            guest_with(
                AccessLevel::ReceptionOnly,
                Permissions {
                    temporary_access_duration_hours: Some(72),
                    ..Permissions::default()
                },
            ),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();
    h.service
        .save(
            new_guest(AccessLevel::ReceptionTemporary),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();
    h.service
        .save(
            guest_with(AccessLevel::ManagerOnly, Permissions::manager_only()),
            &manager_actor(),
            Location::Manager,
        )
        .await
        .unwrap();

    h.clock.advance_hours(25);

    let visible = h
        .service
        .get_all(Location::Reception, &reception_actor())
        .await
        .unwrap();
    let ids: Vec<_> = visible.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![long_window.id]);

    let stats = h
        .service
        .get_statistics(Location::Reception)
        .await
        .unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.by_access_level.reception_temporary, 1);
    assert_eq!(stats.by_sync_status.pending, 2);
    assert_eq!(stats.last_written, Some(test_start()));

    let manager = h
        .service
        .get_all(Location::Manager, &manager_actor())
        .await
        .unwrap();
    assert_eq!(manager.len(), 1);
    let stats = h.service.get_statistics(Location::Manager).await.unwrap();
    assert_eq!(stats.by_access_level.manager_only, 1);
    assert_eq!(stats.expired, 0);
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn storage_failures_propagate_without_events() {
    let clock = test_clock();
    let memory = Arc::new(MemoryRecordStore::with_clock(Arc::new(clock.clone())));
    let flaky = FlakyStore::new(memory.clone());
    let service = GuestDataService::builder()
        .with_store(Arc::new(flaky.clone()))
        .with_remote(Arc::new(ScriptedRemote::succeeding()))
        .with_clock(Arc::new(clock))
        .build()
        .unwrap();
    let mut rx = service.subscribe();

    flaky.fail_writes(true);
    let err = service
        .save(
            new_guest(AccessLevel::ReceptionOnly),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap_err();
    assert!(err.is_storage());
    assert!(topics(&mut rx).is_empty());
    assert_eq!(service.sync().scheduled_count(), 0);
    assert_eq!(memory.len(Location::Reception).await, 0);

    flaky.fail_writes(false);
    let record = service
        .save(
            new_guest(AccessLevel::ReceptionOnly),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    flaky.fail_reads(true);
    let err = service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap_err();
    assert!(err.is_storage());
    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn failed_demotion_on_read_keeps_reception_copy() {
    let clock = test_clock();
    let memory = Arc::new(MemoryRecordStore::with_clock(Arc::new(clock.clone())));
    let flaky = FlakyStore::new(memory.clone());
    let service = GuestDataService::builder()
        .with_store(Arc::new(flaky.clone()))
        .with_remote(Arc::new(ScriptedRemote::succeeding()))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    let record = service
        .save(
            new_guest(AccessLevel::ReceptionTemporary),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();
    clock.advance_hours(25);

    flaky.fail_writes_to(Some(Location::Manager));
    let err = service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap_err();
    assert!(err.is_storage());
    let kept = memory.load(record.id, Location::Reception).await.unwrap();
    assert_eq!(kept.unwrap().access_level, AccessLevel::ReceptionTemporary);

    flaky.fail_writes_to(None);
    let outcome = service
        .get(record.id, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert_eq!(outcome, AccessOutcome::Denied(DenialReason::Expired));
    assert!(memory.load(record.id, Location::Reception).await.unwrap().is_none());
    assert!(memory.load(record.id, Location::Manager).await.unwrap().is_some());
    service.shutdown();
}

// ============================================================================
// Expiry bounds
// ============================================================================

#[tokio::test(start_paused = true)]
async fn oversized_access_windows_are_rejected() {
    let h = harness();
    let oversized = Permissions {
        temporary_access_duration_hours: Some(u32::MAX),
        ..Permissions::default()
    };

    let err = h
        .service
        .save(
            guest_with(AccessLevel::ReceptionOnly, oversized.clone()),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Invalid { .. }));
    assert_eq!(h.memory.len(Location::Reception).await, 0);

    let record = h
        .service
        .save(
            new_guest(AccessLevel::ManagerOnly),
            &manager_actor(),
            Location::Manager,
        )
        .await
        .unwrap();
    let err = h
        .service
        .set_reception_permissions(record.id, oversized, &manager_actor())
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Invalid { .. }));

    let held = held_at(&h, &record, Location::Manager).await.unwrap();
    assert_eq!(held.access_level, AccessLevel::ManagerOnly);
    assert_eq!(held.access_history.len(), 1);
    assert!(held_at(&h, &record, Location::Reception).await.is_none());
    h.service.shutdown();
}

#[test]
fn unbounded_retention_config_is_refused() {
    let mut config = VaultConfig::default();
    config.retention.manager_retention_days = u32::MAX;
    let result = GuestDataService::builder()
        .with_config(config)
        .with_store(Arc::new(MemoryRecordStore::new()))
        .build();
    assert!(matches!(result, Err(VaultError::Invalid { .. })));
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn shutdown_mid_push_leaves_no_timer_behind() {
    let clock = test_clock();
    let memory = Arc::new(MemoryRecordStore::with_clock(Arc::new(clock.clone())));
    let remote = GatedRemote::new();
    let service = GuestDataService::builder()
        .with_store(memory.clone())
        .with_remote(Arc::new(remote.clone()))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    let record = service
        .save(
            new_guest(AccessLevel::ReceptionOnly),
            &reception_actor(),
            Location::Reception,
        )
        .await
        .unwrap();

    // the debounced attempt parks at the remote
    remote.entered().await;
    service.shutdown();

    clock.advance(Duration::seconds(1));
    let patch = GuestRecordPatch {
        phone: Some("+1 555 0142".to_string()),
        ..GuestRecordPatch::default()
    };
    let updated = service
        .update(record.id, patch, &reception_actor(), Location::Reception)
        .await
        .unwrap();
    assert!(matches!(updated, AccessOutcome::Granted(_)));
    remote.release();

    tokio::time::sleep(std::time::Duration::from_secs(10 * 60)).await;
    assert_eq!(service.sync().scheduled_count(), 0);
    assert_eq!(remote.push_count(), 1);
    let held = memory.load(record.id, Location::Reception).await.unwrap().unwrap();
    assert_eq!(held.sync_status, SyncStatus::Pending);
    assert_eq!(held.personal.phone.as_deref(), Some("+1 555 0142"));
}
