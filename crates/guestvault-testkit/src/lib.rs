//! Guestvault Testing Infrastructure
//!
//! Fixtures and mock effect handlers shared by the workspace's test suites.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! guestvault-testkit = { path = "../guestvault-testkit" }
//! ```
//!
//! ```rust,no_run
//! use guestvault_testkit::*;
//!
//! let clock = test_clock();
//! let record = RecordBuilder::new(clock.now()).build();
//! ```

pub mod fixtures;
pub mod remote;
pub mod store;

pub use fixtures::*;
pub use remote::{GatedRemote, ScriptedRemote};
pub use store::FlakyStore;

pub use guestvault_core::TimeSource;
