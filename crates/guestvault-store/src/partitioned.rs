//! Placement-aware view over a [`RecordStore`]
//!
//! A record's copies are always written together: [`PartitionedStore::write_through`]
//! stores the record in every partition its placement names and removes it
//! from the rest. Callers serialize load-modify-store sequences by holding
//! [`PartitionedStore::lock`] for the whole sequence. The lock must not be held
//! across remote calls.

use guestvault_core::{GuestRecord, Location, RecordId, RecordStore, VaultError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Held for the duration of a load-modify-store sequence
pub type StoreGuard<'a> = MutexGuard<'a, ()>;

/// Record store with placement applied and a shared write lock
#[derive(Clone)]
pub struct PartitionedStore {
    store: Arc<dyn RecordStore>,
    write_lock: Arc<Mutex<()>>,
}

impl PartitionedStore {
    /// Wrap a record store
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Underlying handler
    pub fn inner(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Acquire the write lock
    pub async fn lock(&self) -> StoreGuard<'_> {
        self.write_lock.lock().await
    }

    /// Store `record` wherever it belongs and nowhere else.
    ///
    /// `current_location` is recomputed from the access level first; the
    /// returned record is what was persisted. Every save lands before any
    /// stale copy is removed, so a failed write never leaves the record
    /// missing from both partitions.
    pub async fn write_through(&self, mut record: GuestRecord) -> Result<GuestRecord, VaultError> {
        record.refresh_location();
        let (targets, stale): (Vec<Location>, Vec<Location>) = Location::ALL
            .into_iter()
            .partition(|partition| record.current_location.includes(*partition));
        for partition in targets {
            self.store.save(&record, partition).await?;
        }
        for partition in stale {
            self.store.remove(record.id, partition).await?;
        }
        debug!(
            record_id = %record.id,
            location = ?record.current_location,
            backend = self.store.backend_type(),
            "wrote record through placement"
        );
        Ok(record)
    }

    /// Remove a record from every partition; returns whether any copy existed
    pub async fn remove_everywhere(&self, id: RecordId) -> Result<bool, VaultError> {
        let mut removed = false;
        for partition in Location::ALL {
            removed |= self.store.remove(id, partition).await?;
        }
        Ok(removed)
    }

    /// Find a record in any partition
    pub async fn find(&self, id: RecordId) -> Result<Option<GuestRecord>, VaultError> {
        for partition in Location::ALL {
            if let Some(record) = self.store.load(id, partition).await? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Find a record in one partition
    pub async fn find_in(
        &self,
        id: RecordId,
        partition: Location,
    ) -> Result<Option<GuestRecord>, VaultError> {
        self.store.load(id, partition).await
    }

    /// Every record held by a partition
    pub async fn load_partition(&self, partition: Location) -> Result<Vec<GuestRecord>, VaultError> {
        self.store.load_all(partition).await
    }

    /// Every record across partitions, each exactly once
    pub async fn load_union(&self) -> Result<Vec<GuestRecord>, VaultError> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for partition in Location::ALL {
            for record in self.store.load_all(partition).await? {
                if seen.insert(record.id) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}
