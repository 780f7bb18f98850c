//! Record persistence effects
//!
//! A [`RecordStore`] holds one keyed collection of records per partition plus
//! a "last written" timestamp per partition. Implementations report every
//! read, write, or parse failure as [`VaultError::Storage`] or
//! [`VaultError::Serialization`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{GuestRecord, Location, RecordId, VaultError};

/// Per-partition record persistence
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace a record in a partition
    async fn save(&self, record: &GuestRecord, partition: Location) -> Result<(), VaultError>;

    /// Load one record from a partition
    async fn load(&self, id: RecordId, partition: Location)
        -> Result<Option<GuestRecord>, VaultError>;

    /// Load every record in a partition
    async fn load_all(&self, partition: Location) -> Result<Vec<GuestRecord>, VaultError>;

    /// Remove a record from a partition; returns whether it was present
    async fn remove(&self, id: RecordId, partition: Location) -> Result<bool, VaultError>;

    /// When the partition was last written, if ever
    async fn last_written(&self, partition: Location)
        -> Result<Option<DateTime<Utc>>, VaultError>;

    /// Backend name for logs
    fn backend_type(&self) -> &'static str;
}

/// Blanket implementation for Arc<T> where T: RecordStore
#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn save(&self, record: &GuestRecord, partition: Location) -> Result<(), VaultError> {
        (**self).save(record, partition).await
    }

    async fn load(
        &self,
        id: RecordId,
        partition: Location,
    ) -> Result<Option<GuestRecord>, VaultError> {
        (**self).load(id, partition).await
    }

    async fn load_all(&self, partition: Location) -> Result<Vec<GuestRecord>, VaultError> {
        (**self).load_all(partition).await
    }

    async fn remove(&self, id: RecordId, partition: Location) -> Result<bool, VaultError> {
        (**self).remove(id, partition).await
    }

    async fn last_written(
        &self,
        partition: Location,
    ) -> Result<Option<DateTime<Utc>>, VaultError> {
        (**self).last_written(partition).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
