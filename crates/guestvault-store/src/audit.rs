//! Bounded per-record access history

use chrono::{DateTime, Utc};
use guestvault_core::{AuditEntry, GuestRecord};

/// Default number of entries kept per record
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Appends audit entries to records, dropping the oldest past `limit`
#[derive(Debug, Clone, Copy)]
pub struct AuditTrail {
    limit: usize,
}

impl AuditTrail {
    /// Create a trail keeping at most `limit` entries per record
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    /// Entry limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Return `record` with `entry` appended
    pub fn append(&self, mut record: GuestRecord, entry: AuditEntry) -> GuestRecord {
        self.record(&mut record, entry);
        record
    }

    /// Append `entry` in place
    pub fn record(&self, record: &mut GuestRecord, entry: AuditEntry) {
        record.access_history.push(entry);
        let overflow = record.access_history.len().saturating_sub(self.limit);
        if overflow > 0 {
            record.access_history.drain(..overflow);
        }
    }

    /// Drop entries older than `cutoff`; returns how many were dropped
    pub fn prune_older_than(record: &mut GuestRecord, cutoff: DateTime<Utc>) -> usize {
        let before = record.access_history.len();
        record.access_history.retain(|entry| entry.timestamp >= cutoff);
        before - record.access_history.len()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
