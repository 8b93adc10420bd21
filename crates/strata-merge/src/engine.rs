//! Merge engine
//!
//! Walks the top-level fields of the user and baseline trees and dispatches
//! each one to its declared policy.

use serde_json::{Map, Value};

use crate::strategy::{value_kind, MergeError};
use crate::table::PolicyTable;

/// Policy-driven structural merge of a user tree against a baseline
///
/// # Output order
/// Declared fields first, in declaration order, then undeclared user
/// fields in user order, then undeclared baseline-only fields in baseline
/// order.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    table: PolicyTable,
}

impl MergeEngine {
    /// Create engine over a policy table
    #[inline]
    #[must_use]
    pub fn new(table: PolicyTable) -> Self {
        Self { table }
    }

    /// Policy table in use
    #[inline]
    #[must_use]
    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    /// Check the baseline fits every declared policy
    ///
    /// # Errors
    /// Returns the first mismatch between baseline and declarations
    pub fn validate_baseline(&self, baseline: &Value) -> Result<(), MergeError> {
        self.table.validate_against(baseline)
    }

    /// Merge `user` against `baseline`
    ///
    /// A non-object user root is treated as empty, so the result is the
    /// baseline reconciled with nothing.
    ///
    /// # Errors
    /// Returns error if the baseline root is not an object or a baseline
    /// field does not fit its policy
    pub fn merge(&self, user: &Value, baseline: &Value) -> Result<Value, MergeError> {
        let Some(base_fields) = baseline.as_object() else {
            return Err(MergeError::InvalidBaseline(value_kind(baseline)));
        };

        let empty = Map::new();
        let user_fields = match user {
            Value::Object(fields) => fields,
            other => {
                tracing::warn!(
                    "user data root is {}, reconciling from an empty tree",
                    value_kind(other)
                );
                &empty
            }
        };

        let mut result = Map::new();

        for (field, policy) in self.table.iter() {
            let merged = policy.merge(field, user_fields.get(field), base_fields.get(field))?;
            if let Some(value) = merged {
                result.insert(field.to_string(), value);
            }
        }

        let undeclared = user_fields
            .keys()
            .chain(base_fields.keys().filter(|k| !user_fields.contains_key(*k)))
            .filter(|k| self.table.declared(k).is_none());

        for field in undeclared {
            let policy = self.table.policy_for(field);
            if let Some(value) = policy.merge(field, user_fields.get(field), base_fields.get(field))? {
                result.insert(field.clone(), value);
            }
        }

        tracing::debug!(
            "merged {} fields ({} declared)",
            result.len(),
            self.table.len()
        );
        Ok(Value::Object(result))
    }
}
