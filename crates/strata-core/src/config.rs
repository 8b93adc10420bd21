//! Controller configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a
//! valid configuration:
//!
//! ```toml
//! storage_key = "quote-builder"
//! pretty = false
//! save_on_load = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default key the envelope is stored under
pub const DEFAULT_STORAGE_KEY: &str = "strata-state";

/// Persistence controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Store key holding the envelope
    pub storage_key: String,

    /// Write indented JSON
    pub pretty: bool,

    /// Write the reconciled state back right after every load, upgrading
    /// legacy or partially migrated envelopes in place
    pub save_on_load: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            pretty: false,
            save_on_load: true,
        }
    }
}

impl ControllerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set storage key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set pretty printing
    #[inline]
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set write-back after load
    #[inline]
    #[must_use]
    pub fn with_save_on_load(mut self, save_on_load: bool) -> Self {
        self.save_on_load = save_on_load;
        self
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML, names an unknown field
    /// or fails [`validate`](Self::validate)
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("loaded controller config from {}", path.display());
        Ok(config)
    }

    /// Check field values
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for an empty or blank storage key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::invalid("storage_key", "must not be empty"));
        }
        Ok(())
    }
}
