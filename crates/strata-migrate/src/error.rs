//! Error types for migrations

use serde_json::Value;

/// Migration failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MigrationError {
    /// A step rejected the tree it was given
    #[error("migration from v{from} failed: {reason}")]
    StepFailed {
        /// Version the step upgrades from
        from: u32,
        /// Human-readable reason
        reason: String,
    },

    /// A value had the wrong JSON shape for the step
    #[error("migration from v{from}: expected {expected} at {path}")]
    UnexpectedShape {
        /// Version the step upgrades from
        from: u32,
        /// JSON pointer of the offending value
        path: String,
        /// Expected shape
        expected: &'static str,
    },

    /// No step registered for a version below the current one
    #[error("no migration registered from v{0}")]
    Gap(u32),

    /// Two steps registered for the same version
    #[error("duplicate migration registered from v{0}")]
    Duplicate(u32),
}

impl MigrationError {
    /// Create step failure
    #[inline]
    #[must_use]
    pub fn step_failed(from: u32, reason: impl Into<String>) -> Self {
        Self::StepFailed {
            from,
            reason: reason.into(),
        }
    }

    /// Create shape failure
    #[inline]
    #[must_use]
    pub fn unexpected_shape(from: u32, path: impl Into<String>, expected: &'static str) -> Self {
        Self::UnexpectedShape {
            from,
            path: path.into(),
            expected,
        }
    }

    /// Check if error comes from registry construction rather than a step
    #[inline]
    #[must_use]
    pub fn is_registry_error(&self) -> bool {
        matches!(self, Self::Gap(_) | Self::Duplicate(_))
    }
}

/// A migration chain that stopped before reaching the current version
///
/// Carries the output of the last step that succeeded. Callers are expected
/// to continue with [`PartialMigration::data`] at [`PartialMigration::reached`]
/// rather than discard it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("migration stopped at v{reached} (target v{target}): {error}")]
pub struct PartialMigration {
    /// Best tree reached
    pub data: Value,
    /// Version the chain started from
    pub from: u32,
    /// Version of `data` (last step that succeeded)
    pub reached: u32,
    /// Version the chain was heading for
    pub target: u32,
    /// Cause
    #[source]
    pub error: MigrationError,
}

impl PartialMigration {
    /// Number of steps that did apply
    #[inline]
    #[must_use]
    pub fn applied_steps(&self) -> u32 {
        self.reached - self.from
    }

    /// Take the best tree and its version
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (Value, u32) {
        (self.data, self.reached)
    }
}
