//! Unified error system for Guestvault
//!
//! One error type shared by every crate in the workspace. Access denials are
//! not errors: they are reported through [`crate::AccessOutcome`]. Remote sync
//! failures are recovered by the sync coordinator and only surface here when a
//! caller invokes the remote collaborator directly.

use serde::{Deserialize, Serialize};

/// Unified error type for all Guestvault operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VaultError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Persistence read, write, or parse failure
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Remote synchronization failed
    #[error("Sync error: {message}")]
    Sync {
        /// Error message describing the remote failure
        message: String,
    },
}

impl VaultError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a remote sync error
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }

    /// Whether this error came from the persistence layer
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Serialization { .. })
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}
