//! Guestvault Core - Foundation Types and Effect Traits
//!
//! Data model, configuration, errors, domain events, and effect traits for the
//! permission-scoped guest data store. Every other crate in the workspace
//! builds on these types.
//!
//! # Architecture
//!
//! - `record` - guest records, access levels, permissions, audit entries
//! - `config` - retention policy, sync configuration, storage settings
//! - `events` - domain events and the broadcast bus
//! - `effects` - time, storage, remote sync, and connectivity traits
//! - `errors` - the unified [`VaultError`]

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod record;

pub use config::{
    RetentionPolicy, StorageConfig, SyncConfiguration, VaultConfig, MAX_ACCESS_WINDOW_HOURS,
    MAX_RETENTION_DAYS,
};
pub use effects::{
    Connectivity, RecordStore, RemoteSyncEffects, SimulatedClock, SystemClock, TimeSource,
};
pub use errors::VaultError;
pub use events::{CleanupSummary, EventBus, VaultEvent};
pub use identifiers::{ActorId, RecordId};
pub use record::{
    AccessAction, AccessLevel, AccessOutcome, AuditAction, AuditEntry, DataLocation,
    DenialReason, DocumentImage, GuestRecord, GuestRecordPatch, IdentityDocument, Location,
    NewGuestRecord, PersonalData, Permissions, SyncStatus,
};
