//! Migration step trait

use serde_json::Value;

use crate::error::MigrationError;

/// One schema upgrade, from version `from` to `from + 1`
///
/// Implementations must be pure: the same input tree always yields the same
/// output, and the input is never modified.
///
/// Steps must also leave content that already has their output shape
/// untouched. After a chain stops early, the stored tree holds baseline
/// records at the newest shape next to user content at the reached
/// version, and the remaining steps see both when the chain resumes. Key
/// each change on the old shape (a field still present, a value still a
/// string) rather than applying it blindly.
pub trait Migration: Send + Sync {
    /// Transform `tree` (at version `from`) into the next version
    ///
    /// # Errors
    /// Returns error if the tree cannot be upgraded
    fn apply(&self, tree: &Value, from: u32) -> Result<Value, MigrationError>;

    /// Short description (for logs)
    fn description(&self) -> &str;
}

/// Closure-backed migration
pub struct FnMigration<F> {
    description: String,
    transform: F,
}

impl<F> FnMigration<F>
where
    F: Fn(&Value, u32) -> Result<Value, MigrationError> + Send + Sync,
{
    /// Create migration from a closure
    #[inline]
    #[must_use]
    pub fn new(description: impl Into<String>, transform: F) -> Self {
        Self {
            description: description.into(),
            transform,
        }
    }
}

impl<F> std::fmt::Debug for FnMigration<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMigration")
            .field("description", &self.description)
            .field("transform", &"<fn>")
            .finish()
    }
}

impl<F> Migration for FnMigration<F>
where
    F: Fn(&Value, u32) -> Result<Value, MigrationError> + Send + Sync,
{
    fn apply(&self, tree: &Value, from: u32) -> Result<Value, MigrationError> {
        (self.transform)(tree, from)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
