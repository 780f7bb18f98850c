//! Per-partition aggregate counts

use chrono::{DateTime, Utc};
use guestvault_authorization::ExpirationCalculator;
use guestvault_core::{AccessLevel, GuestRecord, Location, SyncStatus};
use serde::{Deserialize, Serialize};

/// Counts by sync status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    /// Awaiting a push
    pub pending: usize,
    /// Matching the remote
    pub synced: usize,
    /// Last push failed
    pub failed: usize,
}

/// Counts by access level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLevelCounts {
    /// Reception-only records
    pub reception_only: usize,
    /// Records inside a temporary reception window
    pub reception_temporary: usize,
    /// Manager-only records
    pub manager_only: usize,
    /// Records held in both partitions
    pub shared_access: usize,
}

/// Snapshot of one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStatistics {
    /// Partition the counts describe
    pub location: Location,
    /// Records held
    pub total: usize,
    /// Breakdown by sync status
    pub by_sync_status: SyncCounts,
    /// Breakdown by access level
    pub by_access_level: AccessLevelCounts,
    /// Records whose window at this partition has closed
    pub expired: usize,
    /// Records with document images attached
    pub with_images: usize,
    /// Records created while offline
    pub offline_created: usize,
    /// Records awaiting a deletion decision
    pub marked_for_deletion: usize,
    /// Last write to the partition
    pub last_written: Option<DateTime<Utc>>,
}

impl DataStatistics {
    /// Aggregate `records` held at `location`
    pub fn collect(
        location: Location,
        records: &[GuestRecord],
        now: DateTime<Utc>,
        last_written: Option<DateTime<Utc>>,
    ) -> Self {
        let mut stats = Self {
            location,
            total: records.len(),
            by_sync_status: SyncCounts::default(),
            by_access_level: AccessLevelCounts::default(),
            expired: 0,
            with_images: 0,
            offline_created: 0,
            marked_for_deletion: 0,
            last_written,
        };

        for record in records {
            match record.sync_status {
                SyncStatus::Pending => stats.by_sync_status.pending += 1,
                SyncStatus::Synced => stats.by_sync_status.synced += 1,
                SyncStatus::Failed => stats.by_sync_status.failed += 1,
            }
            match record.access_level {
                AccessLevel::ReceptionOnly => stats.by_access_level.reception_only += 1,
                AccessLevel::ReceptionTemporary => stats.by_access_level.reception_temporary += 1,
                AccessLevel::ManagerOnly => stats.by_access_level.manager_only += 1,
                AccessLevel::SharedAccess => stats.by_access_level.shared_access += 1,
            }
            if ExpirationCalculator::is_expired(record, location, now) {
                stats.expired += 1;
            }
            if record.has_images() {
                stats.with_images += 1;
            }
            if record.offline_created {
                stats.offline_created += 1;
            }
            if record.is_marked_for_deletion {
                stats.marked_for_deletion += 1;
            }
        }
        stats
    }
}
