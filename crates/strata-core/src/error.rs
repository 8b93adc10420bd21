//! Error types for Strata Core
//!
//! Only construction, backup import and configuration loading can fail.
//! Everything on the load/save path degrades instead of erroring.

use std::path::PathBuf;

use strata_merge::MergeError;
use strata_migrate::MigrationError;
use strata_store::{DecodeError, EncodeError, StoreError};

/// Persistence controller error
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Baseline or policy declarations are inconsistent
    #[error("invalid schema: {0}")]
    Schema(#[from] MergeError),

    /// Migration registry is incomplete
    #[error("invalid migration registry: {0}")]
    Registry(#[from] MigrationError),

    /// Embedded baseline or policy text is not valid JSON
    #[error("schema text is not valid JSON: {0}")]
    SchemaParse(#[source] serde_json::Error),

    /// Backup text could not be decoded
    #[error("backup could not be read: {0}")]
    InvalidBackup(#[source] DecodeError),

    /// Backup decoded to something other than an object tree
    #[error("backup data must be an object, found {0}")]
    BackupShape(&'static str),

    /// State could not be encoded
    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),

    /// Store rejected an operation
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ControllerError {
    /// Check if the error reflects a programming mistake in the compiled-in
    /// schema rather than anything the user did
    #[inline]
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::Schema(_) | Self::Registry(_) | Self::SchemaParse(_))
    }

    /// Check if retrying the same operation later could succeed
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but holds an unusable value
    #[error("invalid config field {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Reason
        reason: String,
    },
}

impl ConfigError {
    /// Create invalid-field error
    #[inline]
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
