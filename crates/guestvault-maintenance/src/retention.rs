//! Per-record retention transitions

use chrono::{DateTime, Duration, Utc};
use guestvault_core::{
    AccessLevel, ActorId, AuditAction, AuditEntry, GuestRecord, Location, RetentionPolicy,
};
use guestvault_store::AuditTrail;

/// Whether the offline data-loss guard protects `record` from demotion and purge.
///
/// An offline-created record that still needs a sync is protected while the
/// engine is offline, and for `offline_retention_days` after creation. The
/// grace period also applies online because reconnecting only schedules the
/// push, and a sweep that runs before it lands would otherwise drop the only
/// copy.
pub fn offline_guarded(
    record: &GuestRecord,
    online: bool,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> bool {
    if !record.offline_created || !record.sync_status.needs_sync() {
        return false;
    }
    !online || now - record.created_at < policy.offline_retention()
}

/// Move `record` to manager-only.
///
/// Revokes reception access, clears the reception window, restarts the
/// manager-side retention clock, and records the change as `system:retention`.
/// The caller persists the result through placement, which drops the
/// reception copy.
pub fn demote_to_manager(
    record: &mut GuestRecord,
    policy: &RetentionPolicy,
    trail: &AuditTrail,
    now: DateTime<Utc>,
) {
    let previous = record.access_level;
    record.access_level = AccessLevel::ManagerOnly;
    record.permissions.allow_reception_access = false;
    record.permissions.allow_reception_modify = false;
    record.permissions.allow_reception_delete = false;
    record.reception_access_expires_at = None;
    record.expires_at = Some(later_by(now, policy.manager_retention()));

    let actor = ActorId::retention();
    record.touch(&actor, now);
    record.refresh_location();
    trail.record(
        record,
        AuditEntry::new(now, actor, AuditAction::Update, Location::Manager)
            .with_details(format!("demoted from {previous:?}: reception access expired")),
    );
}

/// What housekeeping removed from one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Housekeeping {
    /// Document images dropped
    pub images: usize,
    /// Audit entries dropped
    pub audit_entries: usize,
}

impl Housekeeping {
    /// Whether anything changed
    pub fn changed(&self) -> bool {
        self.images > 0 || self.audit_entries > 0
    }
}

/// Drop images and audit entries past their retention
pub fn housekeep(
    record: &mut GuestRecord,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Housekeeping {
    let image_cutoff = earlier_by(now, policy.image_retention());
    let before = record.personal.images.len();
    record
        .personal
        .images
        .retain(|image| image.captured_at >= image_cutoff);
    let images = before - record.personal.images.len();

    let audit_entries =
        AuditTrail::prune_older_than(record, earlier_by(now, policy.audit_log_retention()));

    Housekeeping {
        images,
        audit_entries,
    }
}

// Saturating offsets: policies built without validation must not panic a sweep.
fn later_by(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn earlier_by(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
