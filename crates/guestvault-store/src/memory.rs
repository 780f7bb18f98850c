//! In-memory record store for testing and simulation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guestvault_core::{
    GuestRecord, Location, RecordId, RecordStore, SystemClock, TimeSource, VaultError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Partition {
    records: HashMap<RecordId, GuestRecord>,
    last_written: Option<DateTime<Utc>>,
}

/// In-memory record store
///
/// Records are returned from [`load_all`](RecordStore::load_all) ordered by
/// creation time so tests see a stable order.
#[derive(Clone)]
pub struct MemoryRecordStore {
    partitions: Arc<RwLock<HashMap<Location, Partition>>>,
    clock: Arc<dyn TimeSource>,
}

impl MemoryRecordStore {
    /// Create an empty store stamped by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamped by the given clock
    pub fn with_clock(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            partitions: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Number of records in a partition
    pub async fn len(&self, partition: Location) -> usize {
        self.partitions
            .read()
            .await
            .get(&partition)
            .map_or(0, |p| p.records.len())
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, record: &GuestRecord, partition: Location) -> Result<(), VaultError> {
        let mut partitions = self.partitions.write().await;
        let entry = partitions.entry(partition).or_default();
        entry.records.insert(record.id, record.clone());
        entry.last_written = Some(self.clock.now());
        Ok(())
    }

    async fn load(
        &self,
        id: RecordId,
        partition: Location,
    ) -> Result<Option<GuestRecord>, VaultError> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(&partition)
            .and_then(|p| p.records.get(&id))
            .cloned())
    }

    async fn load_all(&self, partition: Location) -> Result<Vec<GuestRecord>, VaultError> {
        let partitions = self.partitions.read().await;
        let mut records: Vec<GuestRecord> = partitions
            .get(&partition)
            .map(|p| p.records.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|record| (record.created_at, record.id));
        Ok(records)
    }

    async fn remove(&self, id: RecordId, partition: Location) -> Result<bool, VaultError> {
        let mut partitions = self.partitions.write().await;
        let Some(entry) = partitions.get_mut(&partition) else {
            return Ok(false);
        };
        let removed = entry.records.remove(&id).is_some();
        if removed {
            entry.last_written = Some(self.clock.now());
        }
        Ok(removed)
    }

    async fn last_written(
        &self,
        partition: Location,
    ) -> Result<Option<DateTime<Utc>>, VaultError> {
        let partitions = self.partitions.read().await;
        Ok(partitions.get(&partition).and_then(|p| p.last_written))
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
