//! Background task runtime

pub mod tasks;

pub use tasks::RuntimeTaskRegistry;
