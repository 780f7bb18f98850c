//! Record commands: list, show, import

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use guestvault_agent::GuestDataService;
use guestvault_core::{
    AccessLevel, AccessOutcome, ActorId, DataLocation, GuestRecord, Location, NewGuestRecord,
    RecordId, SyncStatus,
};
use serde::Serialize;
use std::path::Path;

/// One line of `guestvault list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    /// Record identifier
    pub id: RecordId,
    /// Guest name
    pub full_name: String,
    /// Visibility
    pub access_level: AccessLevel,
    /// Partitions holding the record
    pub location: DataLocation,
    /// Sync state
    pub sync_status: SyncStatus,
    /// Manager-side expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Flagged for deletion
    pub marked_for_deletion: bool,
}

impl From<&GuestRecord> for RecordSummary {
    fn from(record: &GuestRecord) -> Self {
        Self {
            id: record.id,
            full_name: record.personal.full_name.clone(),
            access_level: record.access_level,
            location: record.current_location,
            sync_status: record.sync_status,
            expires_at: record.expires_at,
            marked_for_deletion: record.is_marked_for_deletion,
        }
    }
}

/// Records visible from `location`
pub async fn list(
    service: &GuestDataService,
    location: Location,
    actor: &ActorId,
) -> Result<Vec<RecordSummary>> {
    let records = service.get_all(location, actor).await?;
    Ok(records.iter().map(RecordSummary::from).collect())
}

/// One record, read through the access rules of `location`
pub async fn show(
    service: &GuestDataService,
    id: RecordId,
    location: Location,
    actor: &ActorId,
) -> Result<GuestRecord> {
    match service.get(id, actor, location).await? {
        AccessOutcome::Granted(record) => Ok(record),
        AccessOutcome::NotFound => Err(anyhow!("record {id} not found at {location}")),
        AccessOutcome::Denied(reason) => {
            Err(anyhow!("access to record {id} at {location} denied: {reason:?}"))
        }
    }
}

/// Create records from a JSON file holding an array of new records
pub async fn import(
    service: &GuestDataService,
    path: &Path,
    location: Location,
    actor: &ActorId,
) -> Result<Vec<RecordId>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let batch: Vec<NewGuestRecord> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of guest records", path.display()))?;
    if batch.is_empty() {
        bail!("{} contains no records", path.display());
    }

    let mut created = Vec::with_capacity(batch.len());
    for data in batch {
        let record = service.save(data, actor, location).await?;
        created.push(record.id);
    }
    tracing::info!(count = created.len(), %location, "imported guest records");
    Ok(created)
}
