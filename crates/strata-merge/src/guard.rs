//! Array guard strategy
//!
//! Not a true merge: it only guarantees that a critical array is an array.
//! Upstream corruption or a partial write can leave such a field null or
//! holding some other value, which the rest of the application cannot cope
//! with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::policy::ArrayFallback;
use crate::strategy::{value_kind, MergeError, MergeStrategy, Shape};

/// User array if it is one, else a safe fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArrayGuardStrategy {
    #[serde(default)]
    fallback: ArrayFallback,
}

impl ArrayGuardStrategy {
    /// Create guard with the given fallback
    #[inline]
    #[must_use]
    pub fn new(fallback: ArrayFallback) -> Self {
        Self { fallback }
    }

    /// Fallback used when the user value is unusable
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> ArrayFallback {
        self.fallback
    }

    fn fallback_value(&self, baseline: Option<&Value>) -> Value {
        match (self.fallback, baseline) {
            (ArrayFallback::Baseline, Some(value @ Value::Array(_))) => value.clone(),
            _ => Value::Array(Vec::new()),
        }
    }

    /// Check a baseline-backed guard has something to fall back to
    ///
    /// # Errors
    /// Returns [`MergeError::MissingFallback`] if the baseline array is
    /// absent or empty
    pub fn validate_baseline(&self, field: &str, baseline: Option<&Value>) -> Result<(), MergeError> {
        if self.fallback != ArrayFallback::Baseline {
            return Ok(());
        }
        match baseline.and_then(Value::as_array) {
            Some(items) if !items.is_empty() => Ok(()),
            _ => Err(MergeError::MissingFallback(field.to_string())),
        }
    }
}

impl MergeStrategy for ArrayGuardStrategy {
    fn merge(
        &self,
        field: &str,
        user: Option<&Value>,
        baseline: Option<&Value>,
    ) -> Result<Option<Value>, MergeError> {
        if let Some(value) = baseline {
            self.shape().check(field, value)?;
        }

        let value = match user {
            Some(value @ Value::Array(_)) => value.clone(),
            None => self.fallback_value(baseline),
            Some(other) => {
                tracing::warn!(
                    "field {} must be an array but is {}, substituting fallback",
                    field,
                    value_kind(other)
                );
                self.fallback_value(baseline)
            }
        };
        Ok(Some(value))
    }

    fn shape(&self) -> Shape {
        Shape::Array
    }

    fn name(&self) -> &'static str {
        "array-nonnull-guard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guard(fallback: ArrayFallback, user: Option<Value>, baseline: Option<Value>) -> Value {
        ArrayGuardStrategy::new(fallback)
            .merge("actors", user.as_ref(), baseline.as_ref())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn array_user_value_kept() {
        let out = guard(ArrayFallback::Baseline, Some(json!(["me"])), Some(json!(["Admin"])));
        assert_eq!(out, json!(["me"]));
    }

    #[test]
    fn empty_user_array_kept() {
        let out = guard(ArrayFallback::Baseline, Some(json!([])), Some(json!(["Admin"])));
        assert_eq!(out, json!([]));
    }

    #[test]
    fn null_becomes_empty() {
        assert_eq!(guard(ArrayFallback::Empty, Some(Value::Null), Some(json!([1]))), json!([]));
        assert_eq!(guard(ArrayFallback::Empty, None, None), json!([]));
    }

    #[test]
    fn null_becomes_baseline() {
        let out = guard(ArrayFallback::Baseline, Some(Value::Null), Some(json!(["Admin", "Sales"])));
        assert_eq!(out, json!(["Admin", "Sales"]));
    }

    #[test]
    fn non_array_replaced() {
        let out = guard(ArrayFallback::Baseline, Some(json!({"0": "Admin"})), Some(json!(["Admin"])));
        assert_eq!(out, json!(["Admin"]));
        assert_eq!(guard(ArrayFallback::Empty, Some(json!("oops")), None), json!([]));
    }

    #[test]
    fn validate_requires_baseline_for_baseline_fallback() {
        let strategy = ArrayGuardStrategy::new(ArrayFallback::Baseline);
        assert!(strategy.validate_baseline("actors", Some(&json!(["Admin"]))).is_ok());
        assert_eq!(
            strategy.validate_baseline("actors", Some(&json!([]))),
            Err(MergeError::MissingFallback("actors".to_string()))
        );
        assert!(strategy.validate_baseline("actors", None).is_err());
        assert!(ArrayGuardStrategy::new(ArrayFallback::Empty)
            .validate_baseline("log", None)
            .is_ok());
    }
}
