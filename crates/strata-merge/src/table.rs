//! Policy table
//!
//! Maps each top-level field of the data tree to its declared
//! [`MergePolicy`]. Declaration order is kept and drives the key order of
//! merged output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::policy::MergePolicy;
use crate::strategy::MergeError;

/// One field declaration, as written in a schema file
///
/// ```json
/// {"field": "catalog", "policy": "collection-by-id", "id_key": "sku"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Top-level field name
    pub field: String,

    /// Declared policy
    #[serde(flatten)]
    pub policy: MergePolicy,
}

impl FieldRule {
    /// Create field rule
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<String>, policy: MergePolicy) -> Self {
        Self {
            field: field.into(),
            policy,
        }
    }
}

/// Declared merge policy per top-level field
///
/// Fields without a declaration merge under [`MergePolicy::Override`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyTable {
    policies: IndexMap<String, MergePolicy>,
}

static UNDECLARED: MergePolicy = MergePolicy::Override;

impl PolicyTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the policy for `field`
    ///
    /// # Errors
    /// Returns [`MergeError::DuplicateField`] if `field` is already declared
    pub fn declare(&mut self, field: impl Into<String>, policy: MergePolicy) -> Result<(), MergeError> {
        let field = field.into();
        if self.policies.contains_key(&field) {
            return Err(MergeError::DuplicateField(field));
        }
        tracing::debug!("declared {} policy for field {}", policy.name(), field);
        self.policies.insert(field, policy);
        Ok(())
    }

    /// Builder form of [`declare`](Self::declare)
    ///
    /// # Errors
    /// Returns [`MergeError::DuplicateField`] if `field` is already declared
    pub fn with(mut self, field: impl Into<String>, policy: MergePolicy) -> Result<Self, MergeError> {
        self.declare(field, policy)?;
        Ok(self)
    }

    /// Build table from a list of rules
    ///
    /// # Errors
    /// Returns [`MergeError::DuplicateField`] on the first repeated field
    pub fn from_rules(rules: impl IntoIterator<Item = FieldRule>) -> Result<Self, MergeError> {
        let mut table = Self::new();
        for rule in rules {
            table.declare(rule.field, rule.policy)?;
        }
        Ok(table)
    }

    /// Rules in declaration order
    #[must_use]
    pub fn rules(&self) -> Vec<FieldRule> {
        self.policies
            .iter()
            .map(|(field, policy)| FieldRule::new(field.clone(), policy.clone()))
            .collect()
    }

    /// Declared policy for `field`, if any
    #[inline]
    #[must_use]
    pub fn declared(&self, field: &str) -> Option<&MergePolicy> {
        self.policies.get(field)
    }

    /// Effective policy for `field`
    #[inline]
    #[must_use]
    pub fn policy_for(&self, field: &str) -> &MergePolicy {
        self.policies.get(field).unwrap_or(&UNDECLARED)
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    /// Declared (field, policy) pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MergePolicy)> {
        self.policies.iter().map(|(f, p)| (f.as_str(), p))
    }

    /// Number of declared fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Check if nothing is declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Check every declared field against the baseline tree
    ///
    /// # Errors
    /// Returns the first field whose baseline value does not fit its policy,
    /// or [`MergeError::InvalidBaseline`] if the baseline is not an object
    pub fn validate_against(&self, baseline: &Value) -> Result<(), MergeError> {
        let Some(fields) = baseline.as_object() else {
            return Err(MergeError::InvalidBaseline(crate::value_kind(baseline)));
        };
        for (field, policy) in &self.policies {
            policy.validate_baseline(field, fields.get(field))?;
        }
        Ok(())
    }
}
