//! Deep-merge strategy
//!
//! Used for free-form configuration trees. The baseline only ever fills
//! holes: a key the user already has is never overwritten, whatever its
//! type. Objects present on both sides are merged recursively.

use serde_json::Value;

use crate::strategy::{MergeError, MergeStrategy, Shape};

/// Baseline fills only what is missing, at any depth
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepMergeStrategy;

impl MergeStrategy for DeepMergeStrategy {
    fn merge(
        &self,
        field: &str,
        user: Option<&Value>,
        baseline: Option<&Value>,
    ) -> Result<Option<Value>, MergeError> {
        if let Some(value) = baseline {
            self.shape().check(field, value)?;
        }

        Ok(match (user, baseline) {
            (Some(user), Some(baseline)) if !user.is_null() => {
                if !user.is_object() {
                    tracing::warn!(
                        "field {} is not an object in user data, keeping user value",
                        field
                    );
                }
                Some(deep_merge(user, baseline))
            }
            (Some(user), None) if !user.is_null() => Some(user.clone()),
            (_, baseline) => baseline.cloned(),
        })
    }

    fn shape(&self) -> Shape {
        Shape::Object
    }

    fn name(&self) -> &'static str {
        "deep-merge"
    }
}

/// Merge `baseline` into `user`, keeping every user leaf
///
/// - key only in baseline: baseline subtree copied
/// - key in both, both objects: recurse
/// - key in both, otherwise: user value kept as-is
///
/// User key order is preserved; keys added from the baseline follow in
/// baseline order.
#[must_use]
pub fn deep_merge(user: &Value, baseline: &Value) -> Value {
    match (user, baseline) {
        (Value::Object(user_map), Value::Object(base_map)) => {
            let mut result = user_map.clone();
            for (key, base_val) in base_map {
                match result.get_mut(key) {
                    Some(user_val) => {
                        if user_val.is_object() && base_val.is_object() {
                            *user_val = deep_merge(user_val, base_val);
                        }
                    }
                    None => {
                        result.insert(key.clone(), base_val.clone());
                    }
                }
            }
            Value::Object(result)
        }
        // Leaves, arrays and type mismatches: user wins
        (user_val, _) => user_val.clone(),
    }
}
