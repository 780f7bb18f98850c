//! JSON file record store
//!
//! Layout under the data directory:
//!
//! ```text
//! reception.json        records held by reception
//! reception.meta.json   { "last_written": ... }
//! manager.json
//! manager.meta.json
//! ```
//!
//! Every write rewrites the whole collection through a temp file and an atomic
//! rename. Writes within one store are serialized by an async mutex.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guestvault_core::{
    GuestRecord, Location, RecordId, RecordStore, SystemClock, TimeSource, VaultError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Companion metadata written next to each collection
#[derive(Debug, Default, Serialize, Deserialize)]
struct PartitionMeta {
    last_written: Option<DateTime<Utc>>,
}

/// Record store backed by per-partition JSON files
pub struct FileRecordStore {
    base_path: PathBuf,
    clock: Arc<dyn TimeSource>,
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Open a store rooted at `base_path`, creating the directory if needed
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self, VaultError> {
        Self::open_with_clock(base_path, Arc::new(SystemClock)).await
    }

    /// Open a store stamped by the given clock
    pub async fn open_with_clock(
        base_path: impl Into<PathBuf>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, VaultError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await.map_err(|e| {
            error!(path = %base_path.display(), error = %e, "failed to create data directory");
            VaultError::storage(format!(
                "failed to create data directory {}: {e}",
                base_path.display()
            ))
        })?;
        info!(path = %base_path.display(), "opened file record store");
        Ok(Self {
            base_path,
            clock,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn collection_path(&self, partition: Location) -> PathBuf {
        self.base_path.join(format!("{}.json", partition.as_str()))
    }

    fn meta_path(&self, partition: Location) -> PathBuf {
        self.base_path.join(format!("{}.meta.json", partition.as_str()))
    }

    async fn read_json<T>(path: &Path) -> Result<Option<T>, VaultError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read store file");
                return Err(VaultError::storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            error!(path = %path.display(), error = %e, "corrupt store file");
            VaultError::serialization(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Write data atomically through a temp file
    async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), VaultError> {
        let temp_path = path.with_extension("tmp");
        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, path).await
        };
        write.await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to write store file");
            VaultError::storage(format!("failed to write {}: {e}", path.display()))
        })
    }

    async fn read_collection(&self, partition: Location) -> Result<Vec<GuestRecord>, VaultError> {
        Ok(Self::read_json(&self.collection_path(partition))
            .await?
            .unwrap_or_default())
    }

    async fn write_collection(
        &self,
        partition: Location,
        records: &[GuestRecord],
    ) -> Result<(), VaultError> {
        let data = serde_json::to_vec_pretty(records)?;
        Self::write_atomic(&self.collection_path(partition), &data).await?;

        let meta = PartitionMeta {
            last_written: Some(self.clock.now()),
        };
        let meta = serde_json::to_vec(&meta)?;
        Self::write_atomic(&self.meta_path(partition), &meta).await?;

        debug!(%partition, records = records.len(), "wrote partition");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn save(&self, record: &GuestRecord, partition: Location) -> Result<(), VaultError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_collection(partition).await?;
        records.retain(|existing| existing.id != record.id);
        records.push(record.clone());
        self.write_collection(partition, &records).await
    }

    async fn load(
        &self,
        id: RecordId,
        partition: Location,
    ) -> Result<Option<GuestRecord>, VaultError> {
        Ok(self
            .read_collection(partition)
            .await?
            .into_iter()
            .find(|record| record.id == id))
    }

    async fn load_all(&self, partition: Location) -> Result<Vec<GuestRecord>, VaultError> {
        self.read_collection(partition).await
    }

    async fn remove(&self, id: RecordId, partition: Location) -> Result<bool, VaultError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_collection(partition).await?;
        let before = records.len();
        records.retain(|existing| existing.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_collection(partition, &records).await?;
        Ok(true)
    }

    async fn last_written(
        &self,
        partition: Location,
    ) -> Result<Option<DateTime<Utc>>, VaultError> {
        let meta: Option<PartitionMeta> = Self::read_json(&self.meta_path(partition)).await?;
        Ok(meta.and_then(|meta| meta.last_written))
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}
