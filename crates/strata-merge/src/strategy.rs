//! Merge strategy trait and core types
//!
//! Provides the [`MergeStrategy`] trait implemented once per merge policy.

use serde_json::Value;

/// Field-level merge strategy
///
/// A strategy sees one top-level field at a time. `None` means the field is
/// absent on that side. Returning `Ok(None)` leaves the field out of the
/// merged tree.
///
/// # Contract
/// - Pure: no side effects besides logging, same inputs give same output
/// - Idempotent: merging the output against the same baseline again yields
///   the output unchanged
/// - Malformed *user* values are recovered from; malformed *baseline* values
///   are programmer errors and reported as [`MergeError`]
pub trait MergeStrategy: Send + Sync + std::fmt::Debug {
    /// Reconcile one field
    ///
    /// # Errors
    /// Returns error if the baseline value does not have the shape the
    /// strategy requires
    fn merge(
        &self,
        field: &str,
        user: Option<&Value>,
        baseline: Option<&Value>,
    ) -> Result<Option<Value>, MergeError>;

    /// Shape the baseline value must have
    fn shape(&self) -> Shape;

    /// Strategy name (for logs and diagnostics)
    fn name(&self) -> &'static str;
}

/// JSON shape a policy operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Any value
    Any,
    /// JSON object
    Object,
    /// JSON array
    Array,
}

impl Shape {
    /// Check if `value` has this shape
    #[inline]
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    /// Fail with [`MergeError::ShapeMismatch`] unless `value` matches
    ///
    /// # Errors
    /// Returns error if `value` has a different shape
    pub fn check(self, field: &str, value: &Value) -> Result<(), MergeError> {
        if self.matches(value) {
            Ok(())
        } else {
            Err(MergeError::shape_mismatch(field, self, value))
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Object => f.write_str("object"),
            Self::Array => f.write_str("array"),
        }
    }
}

/// Name of a value's JSON kind
#[must_use]
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Merge error with diagnostics
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Baseline root is not an object
    #[error("baseline must be an object, found {0}")]
    InvalidBaseline(&'static str),

    /// Baseline value does not fit the declared policy
    #[error("field {field}: policy expects {expected}, baseline has {found}")]
    ShapeMismatch {
        /// Top-level field
        field: String,
        /// Shape the policy requires
        expected: Shape,
        /// Kind actually found
        found: &'static str,
    },

    /// Baseline collection record lacks an identifier
    #[error("field {field}: baseline record {index} has no {id_key:?}")]
    MissingId {
        /// Top-level field
        field: String,
        /// Record position
        index: usize,
        /// Identifier key
        id_key: String,
    },

    /// Baseline fallback required but empty or absent
    #[error("field {0}: baseline fallback array must be present and non-empty")]
    MissingFallback(String),

    /// Field declared twice
    #[error("field {0} already has a merge policy")]
    DuplicateField(String),
}

impl MergeError {
    /// Create shape mismatch for `value`
    #[inline]
    #[must_use]
    pub fn shape_mismatch(field: impl Into<String>, expected: Shape, value: &Value) -> Self {
        Self::ShapeMismatch {
            field: field.into(),
            expected,
            found: value_kind(value),
        }
    }
}
