//! Fault-injecting record store wrapper

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guestvault_core::{GuestRecord, Location, RecordId, RecordStore, VaultError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Wraps a store and fails reads or writes on demand
#[derive(Clone)]
pub struct FlakyStore {
    inner: Arc<dyn RecordStore>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    failing_partition: Arc<Mutex<Option<Location>>>,
}

impl FlakyStore {
    /// Wrap a store; faults start disabled
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            failing_partition: Arc::new(Mutex::new(None)),
        }
    }

    /// Toggle read failures
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Toggle write failures
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail writes to one partition only; `None` clears the fault
    pub fn fail_writes_to(&self, partition: Option<Location>) {
        *self.failing_partition.lock() = partition;
    }

    fn check_read(&self) -> Result<(), VaultError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(VaultError::storage("injected read failure"));
        }
        Ok(())
    }

    fn check_write(&self, partition: Location) -> Result<(), VaultError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VaultError::storage("injected write failure"));
        }
        if *self.failing_partition.lock() == Some(partition) {
            return Err(VaultError::storage(format!(
                "injected write failure at {partition}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn save(&self, record: &GuestRecord, partition: Location) -> Result<(), VaultError> {
        self.check_write(partition)?;
        self.inner.save(record, partition).await
    }

    async fn load(
        &self,
        id: RecordId,
        partition: Location,
    ) -> Result<Option<GuestRecord>, VaultError> {
        self.check_read()?;
        self.inner.load(id, partition).await
    }

    async fn load_all(&self, partition: Location) -> Result<Vec<GuestRecord>, VaultError> {
        self.check_read()?;
        self.inner.load_all(partition).await
    }

    async fn remove(&self, id: RecordId, partition: Location) -> Result<bool, VaultError> {
        self.check_write(partition)?;
        self.inner.remove(id, partition).await
    }

    async fn last_written(
        &self,
        partition: Location,
    ) -> Result<Option<DateTime<Utc>>, VaultError> {
        self.check_read()?;
        self.inner.last_written(partition).await
    }

    fn backend_type(&self) -> &'static str {
        "flaky"
    }
}
