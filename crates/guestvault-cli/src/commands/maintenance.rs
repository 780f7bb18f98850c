//! Operator commands: statistics, retention sweep, pending-sync sweep

use anyhow::{anyhow, Result};
use guestvault_agent::{DataStatistics, GuestDataService};
use guestvault_core::{CleanupSummary, Location};
use guestvault_sync::SyncSweepReport;

/// Statistics for each requested partition
pub async fn stats(
    service: &GuestDataService,
    locations: &[Location],
) -> Result<Vec<DataStatistics>> {
    let mut all = Vec::with_capacity(locations.len());
    for location in locations {
        all.push(service.get_statistics(*location).await?);
    }
    Ok(all)
}

/// Run one retention sweep
pub async fn sweep(service: &GuestDataService) -> Result<CleanupSummary> {
    service
        .run_retention_sweep()
        .await?
        .ok_or_else(|| anyhow!("a retention sweep is already running"))
}

/// Attempt every pending record once
pub async fn pending(service: &GuestDataService) -> Result<SyncSweepReport> {
    service
        .sync_all_pending()
        .await?
        .ok_or_else(|| anyhow!("a pending-sync sweep is already running"))
}
