//! Remote used when nothing is configured

use async_trait::async_trait;
use guestvault_core::{GuestRecord, RemoteSyncEffects, VaultError};

/// Remote that rejects every push
///
/// Records stay pending or failed and are picked up by a later sweep once a
/// real remote is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedRemote;

#[async_trait]
impl RemoteSyncEffects for DisconnectedRemote {
    async fn push_record(&self, record: &GuestRecord) -> Result<(), VaultError> {
        tracing::debug!(record_id = %record.id, "no remote configured");
        Err(VaultError::sync("no remote configured"))
    }
}
