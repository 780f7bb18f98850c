//! Remote synchronization effects
//!
//! The remote is a black box: the coordinator hands it a record and learns
//! only whether the push succeeded.

use async_trait::async_trait;
use std::sync::Arc;

use crate::{GuestRecord, VaultError};

/// Destination that records are synchronized to
#[async_trait]
pub trait RemoteSyncEffects: Send + Sync {
    /// Push the current state of a record; an `Err` schedules a retry
    async fn push_record(&self, record: &GuestRecord) -> Result<(), VaultError>;
}

/// Blanket implementation for Arc<T> where T: RemoteSyncEffects
#[async_trait]
impl<T: RemoteSyncEffects + ?Sized> RemoteSyncEffects for Arc<T> {
    async fn push_record(&self, record: &GuestRecord) -> Result<(), VaultError> {
        (**self).push_record(record).await
    }
}
