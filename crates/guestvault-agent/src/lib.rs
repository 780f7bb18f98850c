//! # Guestvault Agent - Service Composition
//!
//! Assembles the guest data store from the lower crates and owns its
//! background work.
//!
//! ## Key Components
//!
//! - **GuestDataServiceBuilder**: fluent API for wiring collaborators
//! - **GuestDataService**: save, read, update, delete, permission changes,
//!   listings, statistics, and operator hooks
//! - **RuntimeTaskRegistry**: tracked background tasks with cooperative
//!   shutdown
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guestvault_agent::GuestDataService;
//! use guestvault_store::FileRecordStore;
//!
//! let store = FileRecordStore::open(".guestvault").await?;
//! let service = GuestDataService::builder()
//!     .with_store(Arc::new(store))
//!     .build()?;
//! service.start()?;
//! ```

#![forbid(unsafe_code)]

pub mod builder;
pub mod runtime;
pub mod service;
pub mod statistics;

pub use builder::GuestDataServiceBuilder;
pub use runtime::RuntimeTaskRegistry;
pub use service::{DeleteOutcome, GuestDataService, ServiceState};
pub use statistics::{AccessLevelCounts, DataStatistics, SyncCounts};
