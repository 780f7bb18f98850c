//! Command handlers

pub mod maintenance;
pub mod records;

pub use maintenance::{pending, stats, sweep};
pub use records::{import, list, show, RecordSummary};
