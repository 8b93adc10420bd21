//! Quote-builder workspace schema
//!
//! The compiled-in baseline, the per-field merge policies and the migration
//! chain of the demo application the CLI operates on.

use serde_json::{json, Value};
use strata_core::{Baseline, ControllerConfig, ControllerError, PersistenceController};
use strata_merge::{FieldRule, PolicyTable};
use strata_migrate::transform::{for_each_record, rename_key, root_object};
use strata_migrate::{FnMigration, MigrationError, MigrationRegistry};
use strata_store::KeyValueStore;

const BASELINE: &str = include_str!("baseline.json");
const POLICIES: &str = include_str!("policies.json");

/// Compiled-in baseline
///
/// # Errors
/// Returns error if the embedded baseline is not a JSON object
pub fn baseline() -> Result<Baseline, ControllerError> {
    Baseline::from_json_str(BASELINE)
}

/// Declared merge policies
///
/// # Errors
/// Returns error if the embedded declarations do not parse or repeat a field
pub fn policies() -> Result<PolicyTable, ControllerError> {
    let rules: Vec<FieldRule> =
        serde_json::from_str(POLICIES).map_err(ControllerError::SchemaParse)?;
    Ok(PolicyTable::from_rules(rules)?)
}

/// Migration chain, current schema version 3
///
/// - v0: `items` renamed to `catalog`
/// - v1: catalog prices stored as text become numbers
/// - v2: top-level `currency` moves into `settings`
///
/// # Errors
/// Returns error if two steps claim the same version
pub fn migrations() -> Result<MigrationRegistry, ControllerError> {
    let registry = MigrationRegistry::new()
        .with(0, FnMigration::new("rename items to catalog", rename_items))?
        .with(1, FnMigration::new("numeric catalog prices", numeric_prices))?
        .with(2, FnMigration::new("move currency into settings", nest_currency))?;
    Ok(registry)
}

/// Open a controller over `store` with the quote-builder schema
///
/// # Errors
/// Returns error if the schema is inconsistent or the config invalid
pub fn open<S: KeyValueStore>(store: S, config: ControllerConfig) -> Result<PersistenceController<S>, ControllerError> {
    PersistenceController::open(store, baseline()?, policies()?, migrations()?, config)
}

fn rename_items(tree: &Value, _from: u32) -> Result<Value, MigrationError> {
    let mut tree = tree.clone();
    rename_key(&mut tree, "items", "catalog");
    Ok(tree)
}

fn numeric_prices(tree: &Value, from: u32) -> Result<Value, MigrationError> {
    let mut tree = tree.clone();
    for_each_record(&mut tree, "catalog", from, |record| {
        let price = match record.get("price") {
            Some(Value::String(text)) => text.trim().parse::<f64>().map_err(|_| {
                MigrationError::step_failed(from, format!("catalog price {text:?} is not a number"))
            })?,
            _ => return Ok(()),
        };
        record.insert("price".to_string(), json!(price));
        Ok(())
    })?;
    Ok(tree)
}

fn nest_currency(tree: &Value, from: u32) -> Result<Value, MigrationError> {
    let mut tree = tree.clone();
    let root = root_object(&mut tree, from)?;
    let Some(currency) = root.shift_remove("currency") else {
        return Ok(tree);
    };

    match root.entry("settings").or_insert_with(|| json!({})) {
        Value::Object(settings) => {
            settings.entry("currency").or_insert(currency);
        }
        _ => return Err(MigrationError::unexpected_shape(from, "/settings", "object")),
    }
    Ok(tree)
}
