//! Guestvault Authorization - Role- and Time-Aware Access Decisions
//!
//! Pure decision logic for guest records:
//!
//! - [`AccessControlEvaluator`] answers "may this partition perform this action
//!   on this record right now?"
//! - [`ExpirationCalculator`] derives expiry timestamps from the retention
//!   policy and tells whether a record's window at a partition has closed.
//!
//! Nothing here touches storage or the clock; callers pass `now` explicitly so
//! every decision is deterministic and testable.

#![forbid(unsafe_code)]

pub mod access;
pub mod expiration;

pub use access::{AccessControlEvaluator, AccessDecision};
pub use expiration::ExpirationCalculator;
