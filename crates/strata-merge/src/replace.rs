//! Override strategy
//!
//! The user's value wins whenever it is present, including falsy values
//! such as `false`, `0` or `""`. Only absence (or an explicit `null`) lets
//! the baseline through.

use serde_json::Value;

use crate::strategy::{MergeError, MergeStrategy, Shape};

/// User value if present, else baseline
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideStrategy;

impl MergeStrategy for OverrideStrategy {
    fn merge(
        &self,
        _field: &str,
        user: Option<&Value>,
        baseline: Option<&Value>,
    ) -> Result<Option<Value>, MergeError> {
        Ok(match user {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ => baseline.cloned(),
        })
    }

    fn shape(&self) -> Shape {
        Shape::Any
    }

    fn name(&self) -> &'static str {
        "override"
    }
}
