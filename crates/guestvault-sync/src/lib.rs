//! Guestvault Sync - Remote Synchronization
//!
//! Pushes local record changes to a remote through
//! [`RemoteSyncEffects`](guestvault_core::RemoteSyncEffects):
//!
//! - [`SyncCoordinator`] runs the per-record state machine
//!   (pending → syncing → synced | failed), debounces rapid edits, retries
//!   failures with exponential backoff, and sweeps everything still pending
//! - [`BackoffPolicy`] computes retry delays
//! - [`DisconnectedRemote`] stands in when no remote is configured

#![forbid(unsafe_code)]

pub mod backoff;
pub mod coordinator;
pub mod remote;

pub use backoff::BackoffPolicy;
pub use coordinator::{SkipReason, SyncCoordinator, SyncOutcome, SyncSweepReport};
pub use remote::DisconnectedRemote;
