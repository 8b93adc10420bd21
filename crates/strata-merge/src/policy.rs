//! Declared merge policies
//!
//! A field's policy is part of the schema: it is declared once and never
//! inferred from the data. Changing a field's policy is a migration concern.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::CollectionByIdStrategy;
use crate::deep::DeepMergeStrategy;
use crate::guard::ArrayGuardStrategy;
use crate::nested_map::NestedMapStrategy;
use crate::replace::OverrideStrategy;
use crate::strategy::{MergeError, MergeStrategy, Shape};

/// Merge policy for one top-level field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum MergePolicy {
    /// User value if present, else baseline
    #[default]
    Override,

    /// Recursive object merge, baseline fills only missing keys
    DeepMerge,

    /// Identifier-keyed record collection
    CollectionById(CollectionByIdStrategy),

    /// Closed map of named groups of flags
    #[serde(rename = "nested-map-merge")]
    NestedMap,

    /// Array that must never be null
    #[serde(rename = "array-nonnull-guard")]
    ArrayGuard(ArrayGuardStrategy),
}

impl MergePolicy {
    /// Collection keyed by `id_key`, every baseline record eligible
    #[inline]
    #[must_use]
    pub fn collection_by_id(id_key: impl Into<String>) -> Self {
        Self::CollectionById(CollectionByIdStrategy::new(id_key))
    }

    /// Collection keyed by `id_key` mixing system and user records
    ///
    /// Only baseline records with `flag: true` are re-introduced.
    #[inline]
    #[must_use]
    pub fn system_collection(id_key: impl Into<String>, flag: impl Into<String>) -> Self {
        Self::CollectionById(
            CollectionByIdStrategy::new(id_key).with_protected(ProtectedSubset::Flag(flag.into())),
        )
    }

    /// Guarded array with the given fallback
    #[inline]
    #[must_use]
    pub fn array_guard(fallback: ArrayFallback) -> Self {
        Self::ArrayGuard(ArrayGuardStrategy::new(fallback))
    }

    /// Strategy implementing this policy
    #[must_use]
    pub fn strategy(&self) -> &dyn MergeStrategy {
        match self {
            Self::Override => &OverrideStrategy,
            Self::DeepMerge => &DeepMergeStrategy,
            Self::CollectionById(strategy) => strategy,
            Self::NestedMap => &NestedMapStrategy,
            Self::ArrayGuard(strategy) => strategy,
        }
    }

    /// Reconcile one field under this policy
    ///
    /// # Errors
    /// Returns error if the baseline value does not fit the policy
    #[inline]
    pub fn merge(
        &self,
        field: &str,
        user: Option<&Value>,
        baseline: Option<&Value>,
    ) -> Result<Option<Value>, MergeError> {
        self.strategy().merge(field, user, baseline)
    }

    /// Shape the baseline value must have
    #[inline]
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.strategy().shape()
    }

    /// Policy name as written in declarations
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.strategy().name()
    }

    /// Check the baseline value declared for `field` fits this policy
    ///
    /// # Errors
    /// Returns the first mismatch found
    pub fn validate_baseline(&self, field: &str, baseline: Option<&Value>) -> Result<(), MergeError> {
        if let Some(value) = baseline {
            self.shape().check(field, value)?;
        }
        match self {
            Self::CollectionById(strategy) => strategy.validate_baseline(field, baseline),
            Self::NestedMap => NestedMapStrategy::validate_baseline(field, baseline),
            Self::ArrayGuard(strategy) => strategy.validate_baseline(field, baseline),
            Self::Override | Self::DeepMerge => Ok(()),
        }
    }
}

/// Which baseline records a collection merge may re-introduce
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtectedSubset {
    /// Every baseline record
    #[default]
    All,

    /// Only baseline records whose flag key is `true`
    Flag(String),
}

impl ProtectedSubset {
    /// Check if a baseline record is eligible for re-introduction
    #[must_use]
    pub fn includes(&self, record: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Flag(key) => record.get(key).and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

/// Replacement used when a guarded array is missing or not an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayFallback {
    /// Start empty (purely additive arrays)
    #[default]
    Empty,

    /// Use the baseline array (arrays that must never be empty)
    Baseline,
}
