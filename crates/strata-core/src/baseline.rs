//! Compiled-in baseline data set
//!
//! The baseline is read-only input to the merge: the single source of truth
//! for what should exist by default. It is never persisted directly.

use serde_json::Value;
use strata_merge::{value_kind, MergeError};

use crate::error::ControllerError;
use crate::fingerprint::Fingerprint;

/// Immutable baseline tree
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    tree: Value,
    fingerprint: Fingerprint,
}

impl Baseline {
    /// Wrap a baseline tree
    ///
    /// # Errors
    /// Returns [`ControllerError::Schema`] if the root is not an object
    pub fn new(tree: Value) -> Result<Self, ControllerError> {
        if !tree.is_object() {
            return Err(MergeError::InvalidBaseline(value_kind(&tree)).into());
        }
        let fingerprint = Fingerprint::of(&tree);
        Ok(Self { tree, fingerprint })
    }

    /// Parse a baseline from JSON text (typically `include_str!`)
    ///
    /// # Errors
    /// Returns error if the text is not JSON or its root is not an object
    pub fn from_json_str(text: &str) -> Result<Self, ControllerError> {
        let tree = serde_json::from_str(text).map_err(ControllerError::SchemaParse)?;
        Self::new(tree)
    }

    /// Baseline tree
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Baseline value of one top-level field
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.tree.get(field)
    }

    /// Fingerprint of the baseline tree
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_root_required() {
        assert!(Baseline::new(json!({"a": 1})).is_ok());
        let err = Baseline::new(json!([1])).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Schema(MergeError::InvalidBaseline("array"))
        ));
    }

    #[test]
    fn parses_json_text() {
        let baseline = Baseline::from_json_str(r#"{"roles": {"Admin": {}}}"#).unwrap();
        assert_eq!(baseline.get("roles"), Some(&json!({"Admin": {}})));
        assert!(matches!(
            Baseline::from_json_str("{"),
            Err(ControllerError::SchemaParse(_))
        ));
    }
}
