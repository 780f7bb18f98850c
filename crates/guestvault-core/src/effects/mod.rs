//! Effect traits for the guest data store
//!
//! Components never reach for the wall clock, the disk, the network, or the
//! connectivity state directly; they go through these traits so tests can
//! substitute deterministic handlers.
//!
//! - [`TimeSource`]: wall-clock timestamps for expiry and audit entries
//! - [`RecordStore`]: per-partition record persistence
//! - [`RemoteSyncEffects`]: the black-box remote the sync coordinator pushes to
//! - [`Connectivity`]: online/offline signal from the host environment

pub mod connectivity;
pub mod remote;
pub mod storage;
pub mod time;

pub use connectivity::Connectivity;
pub use remote::RemoteSyncEffects;
pub use storage::RecordStore;
pub use time::{SimulatedClock, SystemClock, TimeSource};
