//! Guestvault Maintenance - Retention Sweeps
//!
//! Enforces the retention policy over both partitions:
//!
//! - records whose reception window closed are demoted to manager-only
//! - records past their manager-side retention are purged everywhere
//! - stale document images and audit entries are dropped
//!
//! The per-record transitions live in [`retention`] so the service facade can
//! apply the same demotion inline when a read finds an expired record.

#![forbid(unsafe_code)]

pub mod retention;
pub mod sweeper;

pub use retention::{demote_to_manager, housekeep, offline_guarded, Housekeeping};
pub use sweeper::RetentionSweeper;
