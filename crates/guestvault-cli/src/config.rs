//! Configuration loading and service assembly

use anyhow::{Context, Result};
use guestvault_agent::GuestDataService;
use guestvault_core::VaultConfig;
use guestvault_store::FileRecordStore;
use guestvault_sync::DisconnectedRemote;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load the configuration file (defaults when absent), apply `GUESTVAULT_*`
/// overrides, then the `--data-dir` flag
pub fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<VaultConfig> {
    let mut config = VaultConfig::load(path).with_context(|| match path {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load default config".to_string(),
    })?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }
    Ok(config)
}

/// Open the file-backed store under `config.storage.data_dir`.
///
/// No remote is wired in; syncs fail and records stay pending.
pub async fn open_service(config: &VaultConfig) -> Result<GuestDataService> {
    let store = FileRecordStore::open(config.storage.data_dir.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open data directory {}",
                config.storage.data_dir.display()
            )
        })?;
    let service = GuestDataService::builder()
        .with_config(config.clone())
        .with_store(Arc::new(store))
        .with_remote(Arc::new(DisconnectedRemote))
        .build()?;
    Ok(service)
}
