//! Persistence controller end-to-end behavior

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use strata_core::{Baseline, ControllerConfig, ControllerPhase, PersistenceController, SaveStatus};
use strata_merge::{MergePolicy, PolicyTable};
use strata_migrate::transform::for_each_record;
use strata_migrate::{FnMigration, MigrationError, MigrationRegistry};
use strata_store::{EnvelopeCodec, EnvelopeFormat, FileStore, KeyValueStore, MemoryStore};
use strata_test_utils::{
    envelope, open_controller, open_controller_with, rename_items, sample_baseline, sample_migrations,
    sample_policies, store_with, FlakyStore, KEY, SAMPLE_VERSION,
};

fn stored(store: &impl KeyValueStore) -> Value {
    serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap()
}

#[test]
fn corrupt_input_recovers_to_first_run_state() {
    let corrupt = open_controller(store_with("{\"version\": 2, \"data\": {"));
    let fresh = open_controller(MemoryStore::new());

    assert_eq!(corrupt.state(), fresh.state());
    assert!(corrupt.last_load().unwrap().decode_failed);
    assert!(!fresh.last_load().unwrap().is_degraded());
}

#[test]
fn first_run_state_is_baseline_at_current_version() {
    let controller = open_controller(MemoryStore::new());
    assert_eq!(controller.state().data(), sample_baseline().tree());
    assert_eq!(controller.state().version(), SAMPLE_VERSION);
    assert_eq!(controller.phase(), ControllerPhase::Loaded);
}

#[test]
fn legacy_bare_tree_upgraded_in_place() {
    let legacy = json!({
        "items": [{"id": "lamp", "name": "Lamp", "price": "45.5"}],
        "roles": {"Sales": {"canEditPrices": true}}
    });
    let store = store_with(&legacy.to_string());
    let controller = open_controller(store.clone());

    let report = controller.last_load().unwrap();
    assert_eq!(report.format, EnvelopeFormat::Legacy);
    assert_eq!(report.stored_version, 0);
    assert_eq!(report.version, SAMPLE_VERSION);

    let state = controller.state();
    assert_eq!(
        state.get("catalog").unwrap(),
        &json!([
            {"id": "lamp", "name": "Lamp", "price": 45.5},
            {"id": "desk", "name": "Desk", "price": 300},
            {"id": "chair", "name": "Chair", "price": 120}
        ])
    );
    assert_eq!(
        state.get("roles").unwrap(),
        &json!({
            "Admin": {"canEditPrices": true, "canExport": true},
            "Sales": {"canEditPrices": true, "canExport": false}
        })
    );

    let written = stored(&store);
    assert_eq!(written["version"], json!(SAMPLE_VERSION));
    assert_eq!(&written["data"], state.data());
}

#[test]
fn transitional_shape_reads_version_in_place() {
    let raw = json!({"version": SAMPLE_VERSION, "settings": {"currency": "EUR"}}).to_string();
    let controller = open_controller(store_with(&raw));

    let report = controller.last_load().unwrap();
    assert_eq!(report.format, EnvelopeFormat::Transitional);
    assert_eq!(controller.state().pointer("/settings/currency"), Some(&json!("EUR")));
    assert!(controller.state().get("version").is_none());
}

#[test]
fn failed_migration_keeps_reached_version() {
    let data = json!({"catalog": [{"id": "x", "price": "n/a"}]});
    let store = store_with(&envelope(&data, 1));
    let mut controller = open_controller(store.clone());

    let report = controller.last_load().unwrap().clone();
    assert!(report.migration_stopped);
    assert_eq!(report.version, 1);
    assert_eq!(controller.state().version(), 1);
    assert_eq!(stored(&store)["version"], json!(1));

    // unmigrated record kept verbatim, baseline records still merged in
    let catalog = controller.state().get("catalog").unwrap().as_array().unwrap().clone();
    assert_eq!(catalog[0], json!({"id": "x", "price": "n/a"}));
    assert_eq!(catalog.len(), 3);

    // the user fixes the data; the next refresh resumes from v1
    let mut fixed = controller.state().data().clone();
    fixed["catalog"][0]["price"] = json!("12");
    store.set(KEY, &envelope(&fixed, 1)).unwrap();

    let outcome = controller.refresh();
    assert!(outcome.changed);
    assert_eq!(controller.state().version(), SAMPLE_VERSION);
    assert_eq!(controller.state().pointer("/catalog/0/price"), Some(&json!(12.0)));
}

/// v2 shape: integer `priceCents` instead of a numeric `price`
fn price_to_cents(tree: &Value, from: u32) -> Result<Value, MigrationError> {
    let mut tree = tree.clone();
    for_each_record(&mut tree, "catalog", from, |record| {
        let Some(price) = record.get("price").and_then(Value::as_f64) else {
            return Ok(());
        };
        record.shift_remove("price");
        record.insert("priceCents".to_string(), json!((price * 100.0).round() as i64));
        Ok(())
    })?;
    Ok(tree)
}

#[test]
fn resumed_chain_leaves_merged_baseline_records_alone() {
    let baseline = Baseline::new(json!({
        "catalog": [{"id": "desk", "priceCents": 30000}]
    }))
    .unwrap();
    let policies = PolicyTable::new()
        .with("catalog", MergePolicy::collection_by_id("id"))
        .unwrap();
    let registry = || {
        MigrationRegistry::new()
            .with(0, FnMigration::new("rename items to catalog", rename_items))
            .and_then(|r| r.with(1, FnMigration::new("numeric prices", strata_test_utils::numeric_prices)))
            .and_then(|r| r.with(2, FnMigration::new("prices in cents", price_to_cents)))
            .unwrap()
    };

    let store = store_with(&envelope(&json!({"catalog": [{"id": "x", "price": "n/a"}]}), 1));
    let open = |store: MemoryStore| {
        PersistenceController::open(store, baseline.clone(), policies.clone(), registry(), ControllerConfig::default())
            .unwrap()
    };

    // stops at v1 with the current-shape baseline record merged in and saved
    let controller = open(store.clone());
    assert_eq!(controller.state().version(), 1);
    assert_eq!(stored(&store)["data"]["catalog"][1], json!({"id": "desk", "priceCents": 30000}));

    let mut fixed = controller.state().data().clone();
    fixed["catalog"][0]["price"] = json!("12");
    store.set(KEY, &envelope(&fixed, 1)).unwrap();

    let resumed = open(store);
    assert_eq!(resumed.state().version(), 3);
    assert_eq!(
        resumed.state().get("catalog").unwrap(),
        &json!([
            {"id": "x", "priceCents": 1200},
            {"id": "desk", "priceCents": 30000}
        ])
    );
}

#[test]
fn loose_stored_version_keeps_user_data() {
    let raw = r#"{"version":"3","data":{"settings":{"currency":"EUR"},"catalog":[{"id":"mine"}]}}"#;
    let store = store_with(raw);
    let controller = open_controller(store.clone());

    assert_eq!(controller.state().version(), SAMPLE_VERSION);
    assert_eq!(controller.state().pointer("/settings/currency"), Some(&json!("EUR")));
    assert_eq!(controller.state().pointer("/catalog/0/id"), Some(&json!("mine")));
    assert!(!controller.last_load().unwrap().decode_failed);

    let written = stored(&store);
    assert_eq!(written["version"], json!(SAMPLE_VERSION));
    assert_eq!(written["data"]["settings"]["currency"], json!("EUR"));
    assert_eq!(written["data"]["catalog"][0]["id"], json!("mine"));
}

#[test]
fn unusable_stored_version_migrates_from_zero() {
    let raw = r#"{"version":null,"data":{"settings":{"currency":"EUR"},"items":[{"id":"mine","price":"5"}]}}"#;
    let controller = open_controller(store_with(raw));

    let report = controller.last_load().unwrap();
    assert_eq!(report.format, EnvelopeFormat::Current);
    assert_eq!(report.stored_version, 0);
    assert_eq!(controller.state().version(), SAMPLE_VERSION);
    assert_eq!(controller.state().pointer("/settings/currency"), Some(&json!("EUR")));
    assert_eq!(controller.state().pointer("/catalog/0"), Some(&json!({"id": "mine", "price": 5.0})));
}

#[test]
fn newer_schema_passes_through() {
    let data = json!({"settings": {"currency": "NOK"}, "futureField": [1, 2]});
    let store = store_with(&envelope(&data, SAMPLE_VERSION + 4));
    let controller = open_controller(store.clone());

    assert_eq!(controller.state().version(), SAMPLE_VERSION + 4);
    assert_eq!(controller.state().get("futureField"), Some(&json!([1, 2])));
    assert_eq!(stored(&store)["version"], json!(SAMPLE_VERSION + 4));
}

#[test]
fn migration_monotonic_across_persisted_reload() {
    let legacy = json!({
        "items": [{"id": "a", "price": "10"}, {"id": "b", "price": 3}],
        "settings": {"currency": "SEK"}
    });
    let registry = sample_migrations();
    let codec = EnvelopeCodec::new();

    let straight = registry.run(legacy.clone(), 0).unwrap();

    let first_only = MigrationRegistry::new()
        .with(0, FnMigration::new("rename items to catalog", rename_items))
        .unwrap();
    let step = first_only.run(legacy, 0).unwrap();
    let text = codec.encode(&step.data, step.reached).unwrap();
    let reloaded = codec.decode(Some(&text)).unwrap();
    let resumed = registry.run(reloaded.data, reloaded.version).unwrap();

    assert_eq!(resumed.reached, straight.reached);
    assert_eq!(resumed.data, straight.data);
}

#[test]
fn deleted_records_follow_protected_subset() {
    let store = MemoryStore::new();
    let mut controller = open_controller(store.clone());

    let status = controller.mutate(|tree| {
        let mut next = tree.clone();
        next["catalog"] = json!([{"id": "desk", "name": "Desk", "price": 280}]);
        next["templates"] = json!([{"id": "mine", "name": "Mine"}]);
        next
    });
    assert!(status.is_saved());

    let reopened = open_controller(store);
    // every catalog record is protected, so the removed chair returns
    assert_eq!(
        reopened.state().get("catalog").unwrap(),
        &json!([
            {"id": "desk", "name": "Desk", "price": 280},
            {"id": "chair", "name": "Chair", "price": 120}
        ])
    );
    // user-deleted sample template stays gone, system template returns
    assert_eq!(
        reopened.state().get("templates").unwrap(),
        &json!([
            {"id": "mine", "name": "Mine"},
            {"id": "standard", "name": "Standard", "system": true}
        ])
    );
}

#[test]
fn save_failure_never_interrupts() {
    let store = FlakyStore::new(MemoryStore::new());
    let mut controller = open_controller(store.clone());
    store.fail_writes(true);

    let status = controller.mutate(|tree| {
        let mut next = tree.clone();
        next["settings"]["currency"] = json!("DKK");
        next
    });
    assert!(matches!(status, SaveStatus::Failed(_)));
    assert_eq!(controller.phase(), ControllerPhase::Mutated);
    assert_eq!(controller.state().pointer("/settings/currency"), Some(&json!("DKK")));
    assert_eq!(stored(store.inner())["data"]["settings"]["currency"], json!("USD"));

    store.fail_writes(false);
    assert!(controller.save().is_saved());
    assert_eq!(controller.phase(), ControllerPhase::Saved);
    assert_eq!(stored(store.inner())["data"]["settings"]["currency"], json!("DKK"));
}

#[test]
fn unreadable_store_is_not_overwritten() {
    let existing = envelope(&json!({"settings": {"currency": "PLN"}}), SAMPLE_VERSION);
    let store = FlakyStore::new(store_with(&existing));
    store.fail_reads(true);

    let controller = open_controller(store.clone());
    assert!(controller.last_load().unwrap().read_failed);
    assert_eq!(controller.state().data(), sample_baseline().tree());
    assert_eq!(store.inner().get(KEY).unwrap().unwrap(), existing);
}

#[test]
fn failed_refresh_read_keeps_live_state() {
    let existing = envelope(&json!({"settings": {"currency": "PLN"}}), SAMPLE_VERSION);
    let store = FlakyStore::new(store_with(&existing));
    let mut controller = open_controller(store.clone());
    assert_eq!(controller.state().pointer("/settings/currency"), Some(&json!("PLN")));
    let before = controller.state().clone();

    store.fail_reads(true);
    let outcome = controller.refresh();
    assert!(!outcome.changed);
    assert_eq!(controller.state(), &before);
    assert_eq!(controller.phase(), ControllerPhase::Loaded);

    let report = controller.last_load().unwrap();
    assert!(report.read_failed);
    assert!(report.kept_previous);
    assert_eq!(report.version, SAMPLE_VERSION);

    store.fail_reads(false);
    assert!(controller
        .mutate(|tree| {
            let mut next = tree.clone();
            next["activity"] = json!([{"event": "opened"}]);
            next
        })
        .is_saved());
    assert_eq!(stored(store.inner())["data"]["settings"]["currency"], json!("PLN"));
}

#[test]
fn corrupt_store_on_refresh_keeps_live_state() {
    let store = MemoryStore::new();
    let mut controller = open_controller(store.clone());
    controller.mutate(|tree| {
        let mut next = tree.clone();
        next["settings"]["currency"] = json!("DKK");
        next
    });

    store.set(KEY, "{\"version\": 3, \"data\": {").unwrap();
    assert!(!controller.refresh().changed);
    assert_eq!(controller.state().pointer("/settings/currency"), Some(&json!("DKK")));
    assert_eq!(controller.phase(), ControllerPhase::Saved);

    let report = controller.last_load().unwrap();
    assert!(report.decode_failed && report.kept_previous);
    assert_eq!(store.get(KEY).unwrap().unwrap(), "{\"version\": 3, \"data\": {");

    assert!(controller.save().is_saved());
    assert_eq!(stored(&store)["data"]["settings"]["currency"], json!("DKK"));
}

#[test]
fn refresh_picks_up_out_of_band_writes() {
    let store = MemoryStore::new();
    let mut reader = open_controller(store.clone());
    let mut writer = open_controller(store);

    assert!(!reader.refresh().changed);

    writer.mutate(|tree| {
        let mut next = tree.clone();
        next["activity"] = json!([{"event": "quote sent"}]);
        next
    });

    let outcome = reader.refresh();
    assert!(outcome.changed);
    assert_eq!(reader.state(), writer.state());
}

#[test]
fn reset_and_backup_restore() {
    let store = MemoryStore::new();
    let mut controller = open_controller(store.clone());
    controller.mutate(|tree| {
        let mut next = tree.clone();
        next["roles"]["Intern"] = json!({"canExport": false});
        next
    });
    let backup = controller.export_backup().unwrap();

    assert!(controller.reset().is_saved());
    assert_eq!(controller.state().data(), sample_baseline().tree());
    assert!(controller.state().pointer("/roles/Intern").is_none());

    assert!(controller.import_backup(&backup).unwrap().is_saved());
    assert_eq!(
        controller.state().pointer("/roles/Intern"),
        Some(&json!({"canExport": false}))
    );
    assert_eq!(stored(&store)["data"]["roles"]["Intern"], json!({"canExport": false}));
}

#[test]
fn legacy_backup_import_is_migrated() {
    let mut controller = open_controller(MemoryStore::new());
    let legacy = json!({"items": [{"id": "rug", "price": "99"}]}).to_string();

    assert!(controller.import_backup(&legacy).unwrap().is_saved());
    assert_eq!(controller.state().version(), SAMPLE_VERSION);
    assert_eq!(controller.state().pointer("/catalog/0/price"), Some(&json!(99.0)));
}

#[test]
fn file_store_persists_across_controllers() {
    let dir = tempfile::tempdir().unwrap();
    let config = ControllerConfig::default().with_storage_key("quotes").with_pretty(true);

    let mut controller = open_controller_with(FileStore::new(dir.path()), config.clone());
    controller.mutate(|tree| {
        let mut next = tree.clone();
        next["settings"]["colors"]["accent"] = json!("#fff");
        next
    });

    let path = FileStore::new(dir.path()).path_for("quotes");
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("\n  \"version\""));

    let reopened = open_controller_with(FileStore::new(dir.path()), config);
    assert_eq!(
        reopened.state().pointer("/settings/colors/accent"),
        Some(&json!("#fff"))
    );
    assert_eq!(reopened.state(), controller.state());
}

#[test]
fn controller_new_rejects_bad_config() {
    let result = PersistenceController::new(
        MemoryStore::new(),
        sample_baseline(),
        sample_policies(),
        sample_migrations(),
        ControllerConfig::default().with_storage_key(""),
    );
    assert!(result.is_err());
}

proptest! {
    #[test]
    fn monotonic_for_any_split_point(split in 0u32..=SAMPLE_VERSION, price in 0u32..10_000) {
        let legacy = json!({
            "items": [{"id": "p", "price": price.to_string()}],
            "settings": {}
        });
        let registry = sample_migrations();
        let straight = registry.run(legacy.clone(), 0).unwrap();

        let mut partial = MigrationRegistry::new();
        let steps: [fn(&Value, u32) -> Result<Value, strata_migrate::MigrationError>; 3] = [
            strata_test_utils::rename_items,
            strata_test_utils::numeric_prices,
            strata_test_utils::add_locale,
        ];
        for (from, step) in steps.into_iter().enumerate().take(split as usize) {
            partial.register(from as u32, FnMigration::new("step", step)).unwrap();
        }

        let codec = EnvelopeCodec::new();
        let first = partial.run(legacy, 0).unwrap();
        let reloaded = codec.decode(Some(&codec.encode(&first.data, first.reached).unwrap())).unwrap();
        let resumed = registry.run(reloaded.data, reloaded.version).unwrap();

        prop_assert_eq!(resumed.data, straight.data);
    }
}
