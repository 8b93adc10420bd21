//! Identifier-keyed collection strategy
//!
//! The user's array is taken verbatim, in its original order. Baseline
//! records whose identifier does not occur in it are appended in baseline
//! order, so records shipped in a newer baseline show up automatically.
//!
//! With [`ProtectedSubset::All`] every baseline record is re-introduced,
//! including one the user removed. Collections that mix system-provided and
//! user-authored records declare [`ProtectedSubset::Flag`] instead: only
//! flagged system records come back, everything else the user deletes stays
//! deleted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::policy::ProtectedSubset;
use crate::strategy::{value_kind, MergeError, MergeStrategy, Shape};

fn default_id_key() -> String {
    "id".to_string()
}

/// User records verbatim, eligible baseline records appended by identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionByIdStrategy {
    /// Key holding each record's identifier
    #[serde(default = "default_id_key")]
    id_key: String,

    /// Baseline records eligible for re-introduction
    #[serde(default)]
    protected: ProtectedSubset,
}

impl Default for CollectionByIdStrategy {
    fn default() -> Self {
        Self::new(default_id_key())
    }
}

impl CollectionByIdStrategy {
    /// Create strategy keyed by `id_key`, every baseline record eligible
    #[inline]
    #[must_use]
    pub fn new(id_key: impl Into<String>) -> Self {
        Self {
            id_key: id_key.into(),
            protected: ProtectedSubset::All,
        }
    }

    /// Restrict which baseline records may be appended
    #[inline]
    #[must_use]
    pub fn with_protected(mut self, protected: ProtectedSubset) -> Self {
        self.protected = protected;
        self
    }

    /// Identifier key
    #[inline]
    #[must_use]
    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// Eligibility rule
    #[inline]
    #[must_use]
    pub fn protected(&self) -> &ProtectedSubset {
        &self.protected
    }

    /// Identity of a record, if it has one
    ///
    /// Rendered as JSON text so that `"1"` and `1` stay distinct.
    fn identity(&self, record: &Value) -> Option<String> {
        match record.get(&self.id_key)? {
            Value::Null => None,
            id => Some(id.to_string()),
        }
    }

    /// Merge two arrays
    #[must_use]
    pub fn merge_arrays(&self, user: &[Value], baseline: &[Value]) -> Vec<Value> {
        let mut seen: HashSet<String> = user.iter().filter_map(|r| self.identity(r)).collect();
        let mut result = user.to_vec();

        for record in baseline {
            let Some(id) = self.identity(record) else {
                continue;
            };
            if !self.protected.includes(record) {
                continue;
            }
            if seen.insert(id) {
                result.push(record.clone());
            }
        }

        result
    }

    /// Check every baseline record is an object carrying an identifier
    ///
    /// # Errors
    /// Returns [`MergeError::MissingId`] for the first record without one
    pub fn validate_baseline(&self, field: &str, baseline: Option<&Value>) -> Result<(), MergeError> {
        let Some(records) = baseline.and_then(Value::as_array) else {
            return Ok(());
        };
        match records.iter().position(|r| self.identity(r).is_none()) {
            Some(index) => Err(MergeError::MissingId {
                field: field.to_string(),
                index,
                id_key: self.id_key.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl MergeStrategy for CollectionByIdStrategy {
    fn merge(
        &self,
        field: &str,
        user: Option<&Value>,
        baseline: Option<&Value>,
    ) -> Result<Option<Value>, MergeError> {
        let base_records: &[Value] = match baseline {
            Some(Value::Array(records)) => records.as_slice(),
            Some(other) => return Err(MergeError::shape_mismatch(field, Shape::Array, other)),
            None => &[],
        };

        match user {
            Some(Value::Array(records)) => {
                let merged = self.merge_arrays(records, base_records);
                if merged.len() > records.len() {
                    tracing::debug!(
                        "field {}: added {} baseline records",
                        field,
                        merged.len() - records.len()
                    );
                }
                Ok(Some(Value::Array(merged)))
            }
            Some(Value::Null) | None => Ok(baseline.cloned()),
            Some(other) => {
                tracing::warn!(
                    "field {} should be an array but user data has {}, using baseline",
                    field,
                    value_kind(other)
                );
                Ok(Some(Value::Array(base_records.to_vec())))
            }
        }
    }

    fn shape(&self) -> Shape {
        Shape::Array
    }

    fn name(&self) -> &'static str {
        "collection-by-id"
    }
}
