//! Record and clock fixtures

use chrono::{DateTime, TimeZone, Utc};
use guestvault_core::{
    AccessLevel, ActorId, AuditEntry, DataLocation, DocumentImage, GuestRecord,
    IdentityDocument, Location, NewGuestRecord, PersonalData, Permissions, RecordId,
    SimulatedClock, SyncStatus,
};

/// Fixed start time for deterministic tests
pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// Simulated clock frozen at [`test_start`]
pub fn test_clock() -> SimulatedClock {
    SimulatedClock::new(test_start())
}

/// Front-desk actor
pub fn reception_actor() -> ActorId {
    ActorId::new("reception-desk-1")
}

/// Manager actor
pub fn manager_actor() -> ActorId {
    ActorId::new("manager-1")
}

/// Personal data for a guest with a passport on file
pub fn guest_profile(full_name: &str) -> PersonalData {
    PersonalData {
        full_name: full_name.to_string(),
        email: Some(format!(
            "{}@example.test",
            full_name.to_lowercase().replace(' ', ".")
        )),
        phone: Some("+1 555 0100".to_string()),
        identity_document: Some(IdentityDocument {
            kind: "passport".to_string(),
            number: "X1234567".to_string(),
            issuing_country: Some("NL".to_string()),
        }),
        images: Vec::new(),
    }
}

/// Creation input with default permissions
pub fn new_guest(access_level: AccessLevel) -> NewGuestRecord {
    NewGuestRecord {
        user_id: "user-42".to_string(),
        personal: guest_profile("Grace Hopper"),
        access_level,
        permissions: Permissions::default(),
    }
}

/// Document image captured at `captured_at`
pub fn document_image(label: &str, captured_at: DateTime<Utc>) -> DocumentImage {
    DocumentImage {
        label: label.to_string(),
        uri: format!("file:///scans/{label}.png"),
        captured_at,
    }
}

/// Builder for fully specified records
///
/// Unlike the service's `save`, nothing is derived: expiries, placement, and
/// sync state are exactly what the test sets.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: GuestRecord,
}

impl RecordBuilder {
    /// Start from a synced reception-only record created at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        let actor = reception_actor();
        Self {
            record: GuestRecord {
                id: RecordId::new(),
                user_id: "user-42".to_string(),
                personal: guest_profile("Grace Hopper"),
                access_level: AccessLevel::ReceptionOnly,
                permissions: Permissions::default(),
                created_at: now,
                expires_at: None,
                last_accessed_at: now,
                reception_access_expires_at: None,
                sync_status: SyncStatus::Synced,
                offline_created: false,
                sync_retry_count: 0,
                last_synced_at: None,
                last_sync_error: None,
                created_by: actor.clone(),
                last_modified_by: actor,
                last_modified_at: now,
                access_history: Vec::new(),
                data_source: DataLocation::Reception,
                current_location: DataLocation::Reception,
                is_marked_for_deletion: false,
            },
        }
    }

    /// Set the access level and recompute placement
    pub fn access_level(mut self, level: AccessLevel) -> Self {
        self.record.access_level = level;
        self.record.refresh_location();
        self
    }

    /// Set the origin partition and recompute placement
    pub fn created_at_location(mut self, location: Location) -> Self {
        self.record.data_source = location.into();
        self.record.refresh_location();
        self
    }

    /// Set permissions
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.record.permissions = permissions;
        self
    }

    /// Set the global expiry
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.record.expires_at = Some(at);
        self
    }

    /// Set the reception expiry
    pub fn reception_expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.record.reception_access_expires_at = Some(at);
        self
    }

    /// Set the sync status
    pub fn sync_status(mut self, status: SyncStatus) -> Self {
        self.record.sync_status = status;
        self
    }

    /// Set the retry count
    pub fn retry_count(mut self, count: u32) -> Self {
        self.record.sync_retry_count = count;
        self
    }

    /// Mark as created offline
    pub fn offline_created(mut self) -> Self {
        self.record.offline_created = true;
        self
    }

    /// Flag for deletion
    pub fn marked_for_deletion(mut self) -> Self {
        self.record.is_marked_for_deletion = true;
        self
    }

    /// Attach an image
    pub fn image(mut self, image: DocumentImage) -> Self {
        self.record.personal.images.push(image);
        self
    }

    /// Append an audit entry
    pub fn history(mut self, entry: AuditEntry) -> Self {
        self.record.access_history.push(entry);
        self
    }

    /// Finish
    pub fn build(self) -> GuestRecord {
        self.record
    }
}
