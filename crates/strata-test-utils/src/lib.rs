//! Testing utilities for Strata workspace
//!
//! Shared fixtures: a small quote-builder schema (baseline, policies,
//! three migrations) and stores that fail on demand.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use strata_core::{Baseline, ControllerConfig, PersistenceController};
use strata_merge::{ArrayFallback, MergePolicy, PolicyTable};
use strata_migrate::transform::{for_each_record, insert_missing, rename_key};
use strata_migrate::{FnMigration, MigrationError, MigrationRegistry};
use strata_store::{EnvelopeCodec, KeyValueStore, MemoryStore, StoreError};

pub const KEY: &str = "strata-state";

/// Schema version [`sample_migrations`] upgrades to
pub const SAMPLE_VERSION: u32 = 3;

pub fn sample_baseline_tree() -> Value {
    json!({
        "settings": {
            "currency": "USD",
            "colors": {"accent": "#000"},
            "pdf": {"font": "Inter", "margins": {"top": 20, "bottom": 20}}
        },
        "catalog": [
            {"id": "desk", "name": "Desk", "price": 300},
            {"id": "chair", "name": "Chair", "price": 120}
        ],
        "templates": [
            {"id": "standard", "name": "Standard", "system": true},
            {"id": "sample", "name": "Sample", "system": false}
        ],
        "roles": {
            "Admin": {"canEditPrices": true, "canExport": true},
            "Sales": {"canEditPrices": false, "canExport": false}
        },
        "actors": ["Admin", "Sales"],
        "activity": []
    })
}

pub fn sample_baseline() -> Baseline {
    Baseline::new(sample_baseline_tree()).unwrap()
}

pub fn sample_policies() -> PolicyTable {
    PolicyTable::new()
        .with("settings", MergePolicy::DeepMerge)
        .and_then(|t| t.with("catalog", MergePolicy::collection_by_id("id")))
        .and_then(|t| t.with("templates", MergePolicy::system_collection("id", "system")))
        .and_then(|t| t.with("roles", MergePolicy::NestedMap))
        .and_then(|t| t.with("actors", MergePolicy::array_guard(ArrayFallback::Baseline)))
        .and_then(|t| t.with("activity", MergePolicy::array_guard(ArrayFallback::Empty)))
        .unwrap()
}

/// v0 -> v1: `items` renamed to `catalog`
pub fn rename_items(tree: &Value, _from: u32) -> Result<Value, MigrationError> {
    let mut tree = tree.clone();
    rename_key(&mut tree, "items", "catalog");
    Ok(tree)
}

/// v1 -> v2: catalog prices stored as strings become numbers
pub fn numeric_prices(tree: &Value, from: u32) -> Result<Value, MigrationError> {
    let mut tree = tree.clone();
    for_each_record(&mut tree, "catalog", from, |record| {
        let parsed = match record.get("price") {
            Some(Value::String(text)) => Some(text.parse::<f64>().map_err(|_| {
                MigrationError::step_failed(from, format!("price {text:?} is not a number"))
            })?),
            _ => None,
        };
        if let Some(price) = parsed {
            record.insert("price".to_string(), json!(price));
        }
        Ok(())
    })?;
    Ok(tree)
}

/// v2 -> v3: settings gain a locale
pub fn add_locale(tree: &Value, _from: u32) -> Result<Value, MigrationError> {
    let mut tree = tree.clone();
    if let Some(settings) = tree.get_mut("settings") {
        insert_missing(settings, "locale", json!("en"));
    }
    Ok(tree)
}

pub fn sample_migrations() -> MigrationRegistry {
    MigrationRegistry::new()
        .with(0, FnMigration::new("rename items to catalog", rename_items))
        .and_then(|r| r.with(1, FnMigration::new("numeric catalog prices", numeric_prices)))
        .and_then(|r| r.with(2, FnMigration::new("settings locale", add_locale)))
        .unwrap()
}

pub fn open_controller<S: KeyValueStore>(store: S) -> PersistenceController<S> {
    open_controller_with(store, ControllerConfig::default())
}

pub fn open_controller_with<S: KeyValueStore>(store: S, config: ControllerConfig) -> PersistenceController<S> {
    PersistenceController::open(
        store,
        sample_baseline(),
        sample_policies(),
        sample_migrations(),
        config,
    )
    .unwrap()
}

/// Encoded `{version, data}` envelope
pub fn envelope(data: &Value, version: u32) -> String {
    EnvelopeCodec::new().encode(data, version).unwrap()
}

/// Memory store pre-loaded with raw text under [`KEY`]
pub fn store_with(raw: &str) -> MemoryStore {
    MemoryStore::with_entry(KEY, raw)
}

/// Store whose reads and writes can be made to fail
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::rejected(key, "reads disabled"));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::rejected(key, "writes disabled"));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::rejected(key, "writes disabled"));
        }
        self.inner.remove(key)
    }
}
