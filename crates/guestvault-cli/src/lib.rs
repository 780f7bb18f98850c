//! Guestvault CLI library
//!
//! Command handlers behind the `guestvault` binary. Handlers return plain
//! values; the binary renders them as JSON.

#![forbid(unsafe_code)]

pub mod commands;
pub mod config;

pub use config::{load_config, open_service};
