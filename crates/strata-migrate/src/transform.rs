//! Tree-editing helpers for migration authors
//!
//! All helpers operate on the top-level object and are no-ops when the tree
//! is not an object or the key involved is absent, so a step built from them
//! is safe to run against partially-populated trees.

use serde_json::{Map, Value};

use crate::error::MigrationError;

/// Borrow the top-level object, or fail with a shape error
///
/// # Errors
/// Returns [`MigrationError::UnexpectedShape`] if `tree` is not an object
pub fn root_object(tree: &mut Value, from: u32) -> Result<&mut Map<String, Value>, MigrationError> {
    tree.as_object_mut()
        .ok_or_else(|| MigrationError::unexpected_shape(from, "", "object"))
}

/// Move `old` to `new` unless `new` already exists
///
/// Returns `true` if a value moved.
pub fn rename_key(tree: &mut Value, old: &str, new: &str) -> bool {
    let Some(object) = tree.as_object_mut() else {
        return false;
    };
    if object.contains_key(new) {
        return false;
    }
    match object.shift_remove(old) {
        Some(value) => {
            object.insert(new.to_string(), value);
            true
        }
        None => false,
    }
}

/// Insert `value` under `key` if absent or null
///
/// Returns `true` if the tree changed.
pub fn insert_missing(tree: &mut Value, key: &str, value: Value) -> bool {
    let Some(object) = tree.as_object_mut() else {
        return false;
    };
    match object.get(key) {
        Some(existing) if !existing.is_null() => false,
        _ => {
            object.insert(key.to_string(), value);
            true
        }
    }
}

/// Apply `f` to every object element of the array under `key`
///
/// Non-object elements are left untouched.
///
/// # Errors
/// Returns the first error produced by `f`, or a shape error if `key` holds
/// something other than an array.
pub fn for_each_record<F>(tree: &mut Value, key: &str, from: u32, mut f: F) -> Result<(), MigrationError>
where
    F: FnMut(&mut Map<String, Value>) -> Result<(), MigrationError>,
{
    let Some(value) = tree.as_object_mut().and_then(|o| o.get_mut(key)) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(records) = value.as_array_mut() else {
        return Err(MigrationError::unexpected_shape(from, format!("/{key}"), "array"));
    };
    for record in records.iter_mut().filter_map(Value::as_object_mut) {
        f(record)?;
    }
    Ok(())
}
