//! Live state and controller lifecycle types

use std::fmt;

use serde_json::Value;
use strata_store::{empty_tree, EnvelopeFormat};

use crate::error::ControllerError;
use crate::fingerprint::Fingerprint;

/// Immutable snapshot of the active data tree
///
/// Consumers read it by reference and request changes through the
/// controller, which is its only writer.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveState {
    data: Value,
    version: u32,
    fingerprint: Fingerprint,
}

impl LiveState {
    /// Create snapshot of `data` at schema `version`
    #[must_use]
    pub fn new(data: Value, version: u32) -> Self {
        let fingerprint = Fingerprint::of(&data);
        Self {
            data,
            version,
            fingerprint,
        }
    }

    /// Empty tree at version 0 (before the first load)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::new(empty_tree(), 0)
    }

    /// Data tree
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Schema version of the tree
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Content fingerprint
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Top-level field
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Value at a JSON pointer (`/catalog/0/name`)
    #[inline]
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.data.pointer(pointer)
    }

    /// Take the data tree
    #[inline]
    #[must_use]
    pub fn into_data(self) -> Value {
        self.data
    }
}

/// Controller lifecycle phase
///
/// `Uninitialized → Loaded → {Mutated → Saved}*`, and any phase returns to
/// `Loaded` on refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerPhase {
    /// Nothing loaded yet
    #[default]
    Uninitialized,
    /// Live state reconciled from the store
    Loaded,
    /// Live state changed but not yet persisted
    Mutated,
    /// Live state persisted
    Saved,
}

impl ControllerPhase {
    /// Phase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loaded => "loaded",
            Self::Mutated => "mutated",
            Self::Saved => "saved",
        }
    }
}

impl fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the last load found in the store and how it was recovered
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Shape of the stored text (`Empty` when missing or unreadable)
    pub format: EnvelopeFormat,
    /// Version recorded in the store
    pub stored_version: u32,
    /// Version of the live state after migration
    pub version: u32,
    /// Schema version the registry upgrades to
    pub target_version: u32,
    /// Store could not be read
    pub read_failed: bool,
    /// Stored text was present but undecodable
    pub decode_failed: bool,
    /// Migration chain stopped before the target
    pub migration_stopped: bool,
    /// Store was unusable on a reload, so the previous live state was kept
    pub kept_previous: bool,
}

impl LoadReport {
    /// Check if any stage had to degrade
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.read_failed || self.decode_failed || self.migration_stopped
    }
}

/// Result of a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Reconciled tree differs from the previous live state
    pub changed: bool,
    /// Fingerprint before refresh
    pub previous: Fingerprint,
    /// Fingerprint after refresh
    pub current: Fingerprint,
}

/// Result of a save
///
/// Save failures never propagate as errors: the in-memory live state stays
/// authoritative and the failure is reported here.
#[derive(Debug)]
pub enum SaveStatus {
    /// Envelope written
    Saved {
        /// Encoded size
        bytes: usize,
    },
    /// Write failed, live state kept in memory only
    Failed(ControllerError),
}

impl SaveStatus {
    /// Check if the envelope was written
    #[inline]
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    /// Failure cause, if any
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&ControllerError> {
        match self {
            Self::Saved { .. } => None,
            Self::Failed(e) => Some(e),
        }
    }
}
