//! Guest record data model
//!
//! A [`GuestRecord`] is the single source of truth for one guest's personal
//! data. Which partitions hold a copy is derived from its access level and
//! origin through [`DataLocation::placement`]; partitions never hold copies
//! that were edited independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ActorId, RecordId, VaultError};

// =============================================================================
// Locations
// =============================================================================

/// Storage partition, one per organizational role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Front-desk partition
    Reception,
    /// Management partition
    Manager,
}

impl Location {
    /// Every partition, in sweep order
    pub const ALL: [Location; 2] = [Location::Reception, Location::Manager];

    /// Stable lowercase name used in file layouts and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Reception => "reception",
            Location::Manager => "manager",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reception" => Ok(Location::Reception),
            "manager" => Ok(Location::Manager),
            other => Err(VaultError::invalid(format!("unknown location '{other}'"))),
        }
    }
}

/// Where a record lives, or where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLocation {
    /// Reception partition only
    Reception,
    /// Manager partition only
    Manager,
    /// Both partitions (shared access only)
    Both,
}

impl DataLocation {
    /// Partitions a record with this access level and origin must reside in.
    ///
    /// `Both` is produced only for [`AccessLevel::SharedAccess`].
    pub fn placement(access_level: AccessLevel, origin: DataLocation) -> Self {
        match access_level {
            AccessLevel::SharedAccess => DataLocation::Both,
            AccessLevel::ManagerOnly => DataLocation::Manager,
            AccessLevel::ReceptionOnly | AccessLevel::ReceptionTemporary => match origin {
                DataLocation::Manager => DataLocation::Manager,
                DataLocation::Reception | DataLocation::Both => DataLocation::Reception,
            },
        }
    }

    /// Whether the given partition is part of this location
    pub fn includes(&self, location: Location) -> bool {
        match self {
            DataLocation::Both => true,
            DataLocation::Reception => location == Location::Reception,
            DataLocation::Manager => location == Location::Manager,
        }
    }

    /// Partitions covered by this location
    pub fn partitions(&self) -> Vec<Location> {
        Location::ALL
            .into_iter()
            .filter(|location| self.includes(*location))
            .collect()
    }
}

impl From<Location> for DataLocation {
    fn from(location: Location) -> Self {
        match location {
            Location::Reception => DataLocation::Reception,
            Location::Manager => DataLocation::Manager,
        }
    }
}

// =============================================================================
// Access
// =============================================================================

/// Who may see a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Visible to reception (and management)
    ReceptionOnly,
    /// Visible to reception until the temporary window closes
    ReceptionTemporary,
    /// Visible to management only
    ManagerOnly,
    /// Held in both partitions
    SharedAccess,
}

impl AccessLevel {
    /// Every access level
    pub const ALL: [AccessLevel; 4] = [
        AccessLevel::ReceptionOnly,
        AccessLevel::ReceptionTemporary,
        AccessLevel::ManagerOnly,
        AccessLevel::SharedAccess,
    ];
}

/// Operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    /// Read the record
    View,
    /// Modify the record
    Update,
    /// Delete the record
    Delete,
}

impl AccessAction {
    /// Every action
    pub const ALL: [AccessAction; 3] = [AccessAction::View, AccessAction::Update, AccessAction::Delete];
}

/// Reception-side permissions granted by a manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    /// Reception may see the record
    pub allow_reception_access: bool,
    /// Reception may modify the record
    pub allow_reception_modify: bool,
    /// Reception may delete the record
    pub allow_reception_delete: bool,
    /// Overrides the policy's temporary reception window
    pub temporary_access_duration_hours: Option<u32>,
    /// Reception changes (deletion, sync) wait for a manager
    pub require_manager_approval: bool,
    /// Remove the record once it expires instead of keeping it archived
    pub auto_delete_after_expiry: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            allow_reception_access: true,
            allow_reception_modify: true,
            allow_reception_delete: false,
            temporary_access_duration_hours: None,
            require_manager_approval: false,
            auto_delete_after_expiry: true,
        }
    }
}

impl Permissions {
    /// Permissions with reception access revoked
    pub fn manager_only() -> Self {
        Self {
            allow_reception_access: false,
            allow_reception_modify: false,
            allow_reception_delete: false,
            ..Self::default()
        }
    }
}

// =============================================================================
// Sync state
// =============================================================================

/// Persisted synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local changes not yet pushed
    Pending,
    /// Remote copy matches
    Synced,
    /// Last push failed
    Failed,
}

impl SyncStatus {
    /// Whether the record still needs a push
    pub fn needs_sync(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Failed)
    }
}

// =============================================================================
// Audit
// =============================================================================

/// Kind of access recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Record was read
    View,
    /// Record was created
    Create,
    /// Record was modified (including permission changes and demotion)
    Update,
    /// Record was deleted or flagged for deletion
    Delete,
    /// Record was pushed to the remote
    Sync,
}

/// Immutable audit trail entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the access happened
    pub timestamp: DateTime<Utc>,
    /// Who performed it
    pub actor: ActorId,
    /// What was done
    pub action: AuditAction,
    /// Partition the access came from
    pub location: Location,
    /// Whether it succeeded
    pub success: bool,
    /// Free-form context
    pub details: Option<String>,
}

impl AuditEntry {
    /// Successful entry without details
    pub fn new(
        timestamp: DateTime<Utc>,
        actor: ActorId,
        action: AuditAction,
        location: Location,
    ) -> Self {
        Self {
            timestamp,
            actor,
            action,
            location,
            success: true,
            details: None,
        }
    }

    /// Attach details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark the entry as failed
    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

// =============================================================================
// Personal data
// =============================================================================

/// Identity document presented at check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDocument {
    /// Document kind, e.g. "passport"
    pub kind: String,
    /// Document number
    pub number: String,
    /// Issuing country code
    pub issuing_country: Option<String>,
}

/// Scanned image attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentImage {
    /// Short label, e.g. "passport-front"
    pub label: String,
    /// Where the image bytes live
    pub uri: String,
    /// When the image was captured
    pub captured_at: DateTime<Utc>,
}

/// Personally identifying fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalData {
    /// Full name
    pub full_name: String,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Identity document
    pub identity_document: Option<IdentityDocument>,
    /// Document scans
    pub images: Vec<DocumentImage>,
}

// =============================================================================
// Record
// =============================================================================

/// A guest or staff record with its access, retention, and sync metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRecord {
    /// Record identity
    pub id: RecordId,
    /// Owning user reference
    pub user_id: String,
    /// Personal fields
    pub personal: PersonalData,
    /// Visibility class
    pub access_level: AccessLevel,
    /// Reception-side permissions
    pub permissions: Permissions,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Global expiry (manager-side retention); `None` is permanent
    pub expires_at: Option<DateTime<Utc>>,
    /// Last successful read
    pub last_accessed_at: DateTime<Utc>,
    /// End of reception-side visibility
    pub reception_access_expires_at: Option<DateTime<Utc>>,
    /// Persisted sync state
    pub sync_status: SyncStatus,
    /// Created while the engine was offline
    pub offline_created: bool,
    /// Consecutive failed sync attempts
    pub sync_retry_count: u32,
    /// Last successful sync
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Message from the last failed sync
    pub last_sync_error: Option<String>,
    /// Creating actor
    pub created_by: ActorId,
    /// Last modifying actor
    pub last_modified_by: ActorId,
    /// Last modification time
    pub last_modified_at: DateTime<Utc>,
    /// Append-only access history
    pub access_history: Vec<AuditEntry>,
    /// Partition the record was created in
    pub data_source: DataLocation,
    /// Partitions currently holding a copy
    pub current_location: DataLocation,
    /// Deletion requested, awaiting a manager
    pub is_marked_for_deletion: bool,
}

impl GuestRecord {
    /// Whether any document images are attached
    pub fn has_images(&self) -> bool {
        !self.personal.images.is_empty()
    }

    /// Placement derived from the current access level and origin
    pub fn placement(&self) -> DataLocation {
        DataLocation::placement(self.access_level, self.data_source)
    }

    /// Recompute `current_location` from the access level
    pub fn refresh_location(&mut self) {
        self.current_location = self.placement();
    }

    /// Record a modification by `actor`
    pub fn touch(&mut self, actor: &ActorId, now: DateTime<Utc>) {
        self.last_modified_by = actor.clone();
        self.last_modified_at = now;
    }
}

/// Input for creating a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGuestRecord {
    /// Owning user reference
    pub user_id: String,
    /// Personal fields
    pub personal: PersonalData,
    /// Requested visibility
    pub access_level: AccessLevel,
    /// Reception-side permissions
    #[serde(default)]
    pub permissions: Permissions,
}

/// Field-level changes applied by an update
///
/// `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestRecordPatch {
    /// New owning user reference
    pub user_id: Option<String>,
    /// New full name
    pub full_name: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New phone
    pub phone: Option<String>,
    /// New identity document
    pub identity_document: Option<IdentityDocument>,
    /// Replacement image set
    pub images: Option<Vec<DocumentImage>>,
}

impl GuestRecordPatch {
    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the patch to `record`, returning the names of changed fields
    pub fn apply_to(self, record: &mut GuestRecord) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(user_id) = self.user_id {
            record.user_id = user_id;
            changed.push("user_id");
        }
        if let Some(full_name) = self.full_name {
            record.personal.full_name = full_name;
            changed.push("full_name");
        }
        if let Some(email) = self.email {
            record.personal.email = Some(email);
            changed.push("email");
        }
        if let Some(phone) = self.phone {
            record.personal.phone = Some(phone);
            changed.push("phone");
        }
        if let Some(document) = self.identity_document {
            record.personal.identity_document = Some(document);
            changed.push("identity_document");
        }
        if let Some(images) = self.images {
            record.personal.images = images;
            changed.push("images");
        }
        changed
    }
}

// =============================================================================
// Access outcomes
// =============================================================================

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The access matrix does not grant the action here
    Forbidden,
    /// The record's window at this partition has closed
    Expired,
}

/// Result of a permission-gated lookup
///
/// Denials are ordinary outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome<T> {
    /// Access granted
    Granted(T),
    /// No such record in the partition
    NotFound,
    /// Record exists but access was refused
    Denied(DenialReason),
}

impl<T> AccessOutcome<T> {
    /// The granted value, if any
    pub fn granted(self) -> Option<T> {
        match self {
            AccessOutcome::Granted(value) => Some(value),
            AccessOutcome::NotFound | AccessOutcome::Denied(_) => None,
        }
    }

    /// Whether access was granted
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Granted(_))
    }

    /// Denial reason, if denied
    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            AccessOutcome::Denied(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Map the granted value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AccessOutcome<U> {
        match self {
            AccessOutcome::Granted(value) => AccessOutcome::Granted(f(value)),
            AccessOutcome::NotFound => AccessOutcome::NotFound,
            AccessOutcome::Denied(reason) => AccessOutcome::Denied(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_only_for_shared_access() {
        for level in AccessLevel::ALL {
            for origin in [DataLocation::Reception, DataLocation::Manager] {
                let placement = DataLocation::placement(level, origin);
                assert_eq!(
                    placement == DataLocation::Both,
                    level == AccessLevel::SharedAccess,
                    "{level:?} from {origin:?}"
                );
            }
        }
    }

    #[test]
    fn manager_only_never_placed_at_reception() {
        let placement = DataLocation::placement(AccessLevel::ManagerOnly, DataLocation::Reception);
        assert_eq!(placement.partitions(), vec![Location::Manager]);
    }

    #[test]
    fn reception_levels_stay_at_origin() {
        assert_eq!(
            DataLocation::placement(AccessLevel::ReceptionTemporary, DataLocation::Reception),
            DataLocation::Reception
        );
        assert_eq!(
            DataLocation::placement(AccessLevel::ReceptionOnly, DataLocation::Manager),
            DataLocation::Manager
        );
    }

    #[test]
    fn location_round_trips_through_str() {
        for location in Location::ALL {
            assert_eq!(location.as_str().parse::<Location>().unwrap(), location);
        }
        assert!("lobby".parse::<Location>().is_err());
    }

    #[test]
    fn patch_reports_changed_fields() {
        let now = Utc::now();
        let actor = ActorId::new("desk-1");
        let mut record = GuestRecord {
            id: RecordId::new(),
            user_id: "u-1".into(),
            personal: PersonalData {
                full_name: "Ada".into(),
                ..PersonalData::default()
            },
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
            last_modified_by: actor.clone(),
            last_modified_at: now,
            access_history: Vec::new(),
            data_source: DataLocation::Reception,
            current_location: DataLocation::Reception,
            is_marked_for_deletion: false,
        };

        let patch = GuestRecordPatch {
            full_name: Some("Ada Lovelace".into()),
            phone: Some("+44 20 0000".into()),
            ..GuestRecordPatch::default()
        };
        assert!(!patch.is_empty());

        let changed = patch.apply_to(&mut record);
        assert_eq!(changed, vec!["full_name", "phone"]);
        assert_eq!(record.personal.full_name, "Ada Lovelace");
        assert!(record.personal.email.is_none());
    }

    #[test]
    fn outcome_helpers() {
        let granted: AccessOutcome<u8> = AccessOutcome::Granted(7);
        assert!(granted.is_granted());
        assert_eq!(granted.map(|v| v * 2).granted(), Some(14));

        let denied: AccessOutcome<u8> = AccessOutcome::Denied(DenialReason::Expired);
        assert_eq!(denied.denial(), Some(DenialReason::Expired));
        assert_eq!(denied.granted(), None);
    }
}
