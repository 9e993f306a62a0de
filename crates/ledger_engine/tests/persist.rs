use std::fs;

use ledger_core::StateSnapshot;
use ledger_engine::{
    ensure_output_dir, load_snapshot, save_snapshot, AtomicFileWriter, FileStateStore,
    JsonLinesSink, MemoryStateStore, PersistError, RecordSink, StateStore,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("state");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("TXS.json", "[]").unwrap();
    let second = writer.write("TXS.json", "[\"a\"]").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "[\"a\"]");
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("ADDRESSES.json", "[]").is_err());
    assert!(!file_path.with_file_name("ADDRESSES.json").exists());
}

#[test]
fn snapshot_survives_a_file_store_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = FileStateStore::new(temp.path().join("state"));
    let snapshot = StateSnapshot {
        addresses: vec![("0xabc".to_string(), 2), ("1xyz".to_string(), 10)],
        transactions: vec!["aa".to_string(), "bb".to_string()],
    };

    save_snapshot(&store, &snapshot).unwrap();

    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path_for("ADDRESSES")).unwrap()).unwrap();
    assert_eq!(on_disk, json!([["0xabc", 2], ["1xyz", 10]]));
    assert_eq!(load_snapshot(&store).unwrap(), snapshot);
}

#[test]
fn missing_keys_load_as_empty_state() {
    let temp = TempDir::new().unwrap();
    let store = FileStateStore::new(temp.path());
    assert_eq!(load_snapshot(&store).unwrap(), StateSnapshot::default());
}

#[test]
fn malformed_state_names_the_key() {
    let store = MemoryStateStore::new();
    store.save("TXS", &json!({"not": "a list"})).unwrap();

    let err = load_snapshot(&store).unwrap_err();
    assert!(matches!(err, PersistError::Malformed { ref key, .. } if key == "TXS"));
}

#[test]
fn json_lines_sink_appends_one_record_per_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("storage").join("dataset.jsonl");
    let sink = JsonLinesSink::open(&path).unwrap();

    sink.push(json!({"tx": "0xa1"})).unwrap();
    sink.push(json!({"tx": null})).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "{\"tx\":\"0xa1\"}\n{\"tx\":null}\n");
}
