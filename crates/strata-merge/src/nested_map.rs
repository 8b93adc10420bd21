//! Nested-map strategy
//!
//! For maps whose keys are a baseline-defined set of named groups, each
//! holding a record of flags (role name to permission set). Every baseline
//! group is guaranteed to exist in the output; within a group the user's
//! flags override the baseline's one field at a time, so a flag introduced
//! by a newer baseline gets its default while existing choices survive.

use serde_json::{Map, Value};

use crate::strategy::{value_kind, MergeError, MergeStrategy, Shape};

/// Every baseline group present, flags shallow-merged per group
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedMapStrategy;

impl NestedMapStrategy {
    /// Merge two group maps
    ///
    /// Groups only the user has (created after the baseline was compiled)
    /// are kept verbatim after the baseline groups.
    #[must_use]
    pub fn merge_maps(field: &str, user: &Map<String, Value>, baseline: &Map<String, Value>) -> Map<String, Value> {
        let mut result = Map::new();

        for (group, base_group) in baseline {
            let merged = match (user.get(group), base_group) {
                (Some(Value::Object(user_flags)), Value::Object(base_flags)) => {
                    let mut flags = base_flags.clone();
                    for (flag, value) in user_flags {
                        flags.insert(flag.clone(), value.clone());
                    }
                    Value::Object(flags)
                }
                (Some(other), _) if !other.is_null() && !other.is_object() => {
                    tracing::warn!(
                        "field {}: group {} is {} in user data, using baseline group",
                        field,
                        group,
                        value_kind(other)
                    );
                    base_group.clone()
                }
                _ => base_group.clone(),
            };
            result.insert(group.clone(), merged);
        }

        for (group, value) in user {
            if !baseline.contains_key(group) {
                result.insert(group.clone(), value.clone());
            }
        }

        result
    }

    /// Check every baseline group is an object of flags
    ///
    /// # Errors
    /// Returns [`MergeError::ShapeMismatch`] naming the offending group
    pub fn validate_baseline(field: &str, baseline: Option<&Value>) -> Result<(), MergeError> {
        let Some(groups) = baseline.and_then(Value::as_object) else {
            return Ok(());
        };
        for (group, value) in groups {
            Shape::Object.check(&format!("{field}.{group}"), value)?;
        }
        Ok(())
    }
}

impl MergeStrategy for NestedMapStrategy {
    fn merge(
        &self,
        field: &str,
        user: Option<&Value>,
        baseline: Option<&Value>,
    ) -> Result<Option<Value>, MergeError> {
        let base_groups = match baseline {
            Some(Value::Object(groups)) => groups,
            Some(other) => return Err(MergeError::shape_mismatch(field, Shape::Object, other)),
            None => {
                return Ok(user.filter(|v| !v.is_null()).cloned());
            }
        };

        match user {
            Some(Value::Object(user_groups)) => Ok(Some(Value::Object(Self::merge_maps(
                field,
                user_groups,
                base_groups,
            )))),
            Some(Value::Null) | None => Ok(baseline.cloned()),
            Some(other) => {
                tracing::warn!(
                    "field {} should be an object but user data has {}, using baseline",
                    field,
                    value_kind(other)
                );
                Ok(baseline.cloned())
            }
        }
    }

    fn shape(&self) -> Shape {
        Shape::Object
    }

    fn name(&self) -> &'static str {
        "nested-map-merge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn merge(user: Value, baseline: Value) -> Value {
        NestedMapStrategy
            .merge("roles", Some(&user), Some(&baseline))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn every_baseline_group_present() {
        let merged = merge(
            json!({"Admin": {"canX": false}}),
            json!({"Admin": {"canX": true}, "Sales": {"canX": false}}),
        );
        assert_eq!(
            merged,
            json!({"Admin": {"canX": false}, "Sales": {"canX": false}})
        );
    }

    #[test]
    fn new_flags_default_from_baseline() {
        let merged = merge(
            json!({"Sales": {"canEditPrices": true}}),
            json!({"Sales": {"canEditPrices": false, "canExport": false}}),
        );
        assert_eq!(
            merged,
            json!({"Sales": {"canEditPrices": true, "canExport": false}})
        );
    }

    #[test]
    fn user_only_groups_kept() {
        let merged = merge(
            json!({"Intern": {"canX": false}}),
            json!({"Admin": {"canX": true}}),
        );
        assert_eq!(
            merged,
            json!({"Admin": {"canX": true}, "Intern": {"canX": false}})
        );
    }

    #[test]
    fn user_only_flags_kept() {
        let merged = merge(
            json!({"Admin": {"legacyFlag": true}}),
            json!({"Admin": {"canX": true}}),
        );
        assert_eq!(merged, json!({"Admin": {"canX": true, "legacyFlag": true}}));
    }

    #[test]
    fn corrupt_group_replaced() {
        let merged = merge(json!({"Admin": "root"}), json!({"Admin": {"canX": true}}));
        assert_eq!(merged, json!({"Admin": {"canX": true}}));
    }

    #[test]
    fn null_group_replaced() {
        let merged = merge(json!({"Admin": null}), json!({"Admin": {"canX": true}}));
        assert_eq!(merged, json!({"Admin": {"canX": true}}));
    }

    #[test]
    fn absent_or_corrupt_map_uses_baseline() {
        let baseline = json!({"Admin": {"canX": true}});
        assert_eq!(
            NestedMapStrategy.merge("roles", None, Some(&baseline)).unwrap(),
            Some(baseline.clone())
        );
        assert_eq!(
            NestedMapStrategy
                .merge("roles", Some(&json!([1])), Some(&baseline))
                .unwrap(),
            Some(baseline)
        );
    }

    #[test]
    fn no_baseline_keeps_user() {
        let user = json!({"Custom": {}});
        assert_eq!(
            NestedMapStrategy.merge("roles", Some(&user), None).unwrap(),
            Some(user)
        );
    }

    #[test]
    fn idempotent() {
        let baseline = json!({"Admin": {"a": true, "b": true}, "Sales": {"a": false}});
        let once = merge(json!({"Sales": {"a": true}, "X": {}}), baseline.clone());
        let twice = merge(once.clone(), baseline);
        assert_eq!(once, twice);
    }

    #[test]
    fn validate_baseline_groups_must_be_objects() {
        let err = NestedMapStrategy::validate_baseline("roles", Some(&json!({"Admin": true})))
            .unwrap_err();
        assert!(matches!(err, MergeError::ShapeMismatch { ref field, .. } if field == "roles.Admin"));
    }
}
