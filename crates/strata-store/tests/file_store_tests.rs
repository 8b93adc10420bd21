use strata_store::{EnvelopeCodec, EnvelopeFormat, FileStore, KeyValueStore};

use serde_json::json;

#[test]
fn missing_key_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    assert!(store.get("app-state").unwrap().is_none());
}

#[test]
fn set_creates_directory_and_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("nested").join("store"));

    store.set("app-state", "first").unwrap();
    store.set("app-state", "second").unwrap();

    assert_eq!(store.get("app-state").unwrap().as_deref(), Some("second"));
    assert!(store.path_for("app-state").exists());
}

#[test]
fn remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    store.set("k", "v").unwrap();
    store.remove("k").unwrap();
    store.remove("k").unwrap();
    assert!(store.get("k").unwrap().is_none());
}

#[test]
fn no_temp_files_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    for i in 0..5 {
        store.set("k", &format!("v{i}")).unwrap();
    }

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn envelope_survives_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let codec = EnvelopeCodec::new();

    let data = json!({"catalog": [{"id": "svc-1", "name": "Audit"}]});
    store.set("app-state", &codec.encode(&data, 3).unwrap()).unwrap();

    let decoded = codec.decode(store.get("app-state").unwrap().as_deref()).unwrap();
    assert_eq!(decoded.format, EnvelopeFormat::Current);
    assert_eq!(decoded.version, 3);
    assert_eq!(decoded.data, data);
}
