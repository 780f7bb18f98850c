//! Process-wide configuration
//!
//! Configuration is loaded from a TOML or JSON file, then overridden from
//! `GUESTVAULT_*` environment variables, then validated. Keys use dotted
//! section paths (`retention.manager_retention_days`); in environment variables
//! the dot is written as a double underscore
//! (`GUESTVAULT_RETENTION__MANAGER_RETENTION_DAYS`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::VaultError;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "GUESTVAULT_";

/// Longest retention period accepted, in days
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Longest access window accepted, in hours
pub const MAX_ACCESS_WINDOW_HOURS: u32 = MAX_RETENTION_DAYS * 24;

// =============================================================================
// Retention
// =============================================================================

/// How long personal data stays visible and stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Reception-side visibility window in hours
    pub reception_temp_access_hours: u32,
    /// Manager-side retention in days
    pub manager_retention_days: u32,
    /// Grace period for unsynced offline-created records in days
    pub offline_retention_days: u32,
    /// Document image retention in days
    pub image_retention_days: u32,
    /// Audit history retention in days
    pub audit_log_retention_days: u32,
    /// Run the retention sweeper on a timer
    pub auto_cleanup_enabled: bool,
    /// Sweeper period in minutes
    pub cleanup_interval_minutes: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            reception_temp_access_hours: 24,
            manager_retention_days: 365,
            offline_retention_days: 7,
            image_retention_days: 30,
            audit_log_retention_days: 90,
            auto_cleanup_enabled: true,
            cleanup_interval_minutes: 60,
        }
    }
}

impl RetentionPolicy {
    /// Reception-side visibility window
    pub fn reception_temp_access(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.reception_temp_access_hours))
    }

    /// Manager-side retention
    pub fn manager_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.manager_retention_days))
    }

    /// Offline grace period
    pub fn offline_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.offline_retention_days))
    }

    /// Image retention
    pub fn image_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.image_retention_days))
    }

    /// Audit history retention
    pub fn audit_log_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.audit_log_retention_days))
    }

    /// Sweeper period
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.cleanup_interval_minutes) * 60)
    }
}

// =============================================================================
// Sync
// =============================================================================

/// Remote synchronization tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfiguration {
    /// Full-sweep period in minutes
    pub auto_sync_interval_minutes: u32,
    /// Automatic retries before waiting for the next sweep
    pub max_retry_attempts: u32,
    /// Growth factor between retry delays
    pub retry_backoff_multiplier: f64,
    /// Delay unit for retries in milliseconds
    pub retry_base_delay_ms: u64,
    /// Quiet period before the first attempt in milliseconds
    pub debounce_ms: u64,
    /// Only shared records may sync
    pub require_manager_approval_for_sync: bool,
    /// Records requiring manager approval sync only once shared
    pub sync_only_with_permission: bool,
    /// Offline-created records go first in a full sweep
    pub prioritize_offline_data: bool,
}

impl Default for SyncConfiguration {
    fn default() -> Self {
        Self {
            auto_sync_interval_minutes: 5,
            max_retry_attempts: 3,
            retry_backoff_multiplier: 2.0,
            retry_base_delay_ms: 1_000,
            debounce_ms: 1_000,
            require_manager_approval_for_sync: false,
            sync_only_with_permission: true,
            prioritize_offline_data: true,
        }
    }
}

impl SyncConfiguration {
    /// Full-sweep period
    pub fn auto_sync_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.auto_sync_interval_minutes) * 60)
    }

    /// Retry delay unit
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Debounce window
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the partition files
    pub data_dir: PathBuf,
    /// Audit entries kept per record before the oldest are dropped
    pub audit_history_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".guestvault"),
            audit_history_limit: 256,
        }
    }
}

// =============================================================================
// Top-level configuration
// =============================================================================

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Retention policy
    pub retention: RetentionPolicy,
    /// Sync configuration
    pub sync: SyncConfiguration,
    /// Storage settings
    pub storage: StorageConfig,
}

impl VaultConfig {
    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file(path: &Path) -> Result<Self, VaultError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VaultError::invalid(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| VaultError::invalid(format!("Invalid TOML: {e}"))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| VaultError::invalid(format!("Invalid JSON: {e}"))),
            _ => Err(VaultError::invalid("Unsupported file format")),
        }
    }

    /// Load a file if it exists, otherwise start from defaults; then apply
    /// environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self, VaultError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::load_from_file(path)?,
            _ => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GUESTVAULT_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<(), VaultError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply overrides from `(name, value)` pairs; names without the prefix
    /// are ignored
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), VaultError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some(key) = name.strip_prefix(ENV_PREFIX) {
                let key = key.to_ascii_lowercase().replace("__", ".");
                self.set_from_string(&key, &value)?;
            }
        }
        Ok(())
    }

    /// Set one value by dotted key
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), VaultError> {
        match key {
            "retention.reception_temp_access_hours" => {
                self.retention.reception_temp_access_hours = parse(key, value)?;
            }
            "retention.manager_retention_days" => {
                self.retention.manager_retention_days = parse(key, value)?;
            }
            "retention.offline_retention_days" => {
                self.retention.offline_retention_days = parse(key, value)?;
            }
            "retention.image_retention_days" => {
                self.retention.image_retention_days = parse(key, value)?;
            }
            "retention.audit_log_retention_days" => {
                self.retention.audit_log_retention_days = parse(key, value)?;
            }
            "retention.auto_cleanup_enabled" => {
                self.retention.auto_cleanup_enabled = parse(key, value)?;
            }
            "retention.cleanup_interval_minutes" => {
                self.retention.cleanup_interval_minutes = parse(key, value)?;
            }
            "sync.auto_sync_interval_minutes" => {
                self.sync.auto_sync_interval_minutes = parse(key, value)?;
            }
            "sync.max_retry_attempts" => self.sync.max_retry_attempts = parse(key, value)?,
            "sync.retry_backoff_multiplier" => {
                self.sync.retry_backoff_multiplier = parse(key, value)?;
            }
            "sync.retry_base_delay_ms" => self.sync.retry_base_delay_ms = parse(key, value)?,
            "sync.debounce_ms" => self.sync.debounce_ms = parse(key, value)?,
            "sync.require_manager_approval_for_sync" => {
                self.sync.require_manager_approval_for_sync = parse(key, value)?;
            }
            "sync.sync_only_with_permission" => {
                self.sync.sync_only_with_permission = parse(key, value)?;
            }
            "sync.prioritize_offline_data" => {
                self.sync.prioritize_offline_data = parse(key, value)?;
            }
            "storage.data_dir" | "data_dir" => self.storage.data_dir = PathBuf::from(value),
            "storage.audit_history_limit" => {
                self.storage.audit_history_limit = parse(key, value)?;
            }
            _ => {
                return Err(VaultError::invalid(format!(
                    "Unknown configuration key: {key}"
                )))
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.retention.reception_temp_access_hours == 0 {
            return Err(VaultError::invalid(
                "retention.reception_temp_access_hours cannot be 0",
            ));
        }
        if self.retention.manager_retention_days == 0 {
            return Err(VaultError::invalid("retention.manager_retention_days cannot be 0"));
        }
        if self.retention.reception_temp_access_hours > MAX_ACCESS_WINDOW_HOURS {
            return Err(VaultError::invalid(format!(
                "retention.reception_temp_access_hours cannot exceed {MAX_ACCESS_WINDOW_HOURS}"
            )));
        }
        for (key, days) in [
            ("retention.manager_retention_days", self.retention.manager_retention_days),
            ("retention.offline_retention_days", self.retention.offline_retention_days),
            ("retention.image_retention_days", self.retention.image_retention_days),
            ("retention.audit_log_retention_days", self.retention.audit_log_retention_days),
        ] {
            if days > MAX_RETENTION_DAYS {
                return Err(VaultError::invalid(format!(
                    "{key} cannot exceed {MAX_RETENTION_DAYS}"
                )));
            }
        }
        if self.retention.cleanup_interval_minutes == 0 {
            return Err(VaultError::invalid("retention.cleanup_interval_minutes cannot be 0"));
        }
        if self.sync.auto_sync_interval_minutes == 0 {
            return Err(VaultError::invalid("sync.auto_sync_interval_minutes cannot be 0"));
        }
        if self.sync.max_retry_attempts == 0 {
            return Err(VaultError::invalid("sync.max_retry_attempts cannot be 0"));
        }
        if !self.sync.retry_backoff_multiplier.is_finite()
            || self.sync.retry_backoff_multiplier <= 1.0
        {
            return Err(VaultError::invalid(
                "sync.retry_backoff_multiplier must be a finite number > 1",
            ));
        }
        if self.sync.retry_base_delay_ms == 0 {
            return Err(VaultError::invalid("sync.retry_base_delay_ms cannot be 0"));
        }
        if self.storage.audit_history_limit == 0 {
            return Err(VaultError::invalid("storage.audit_history_limit cannot be 0"));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, VaultError> {
    value
        .trim()
        .parse()
        .map_err(|_| VaultError::invalid(format!("Invalid value for {key}: '{value}'")))
}
