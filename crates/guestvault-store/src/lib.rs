//! Guestvault Store - Partitioned Record Persistence
//!
//! [`RecordStore`](guestvault_core::RecordStore) handlers plus the pieces that
//! sit directly on top of them:
//!
//! - [`MemoryRecordStore`] - in-process maps, for tests and simulation
//! - [`FileRecordStore`] - one JSON collection file per partition
//! - [`PartitionedStore`] - applies the placement rule and owns the write lock
//! - [`AuditTrail`] - bounded per-record access history

#![forbid(unsafe_code)]

pub mod audit;
pub mod file;
pub mod memory;
pub mod partitioned;

pub use audit::AuditTrail;
pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;
pub use partitioned::{PartitionedStore, StoreGuard};
