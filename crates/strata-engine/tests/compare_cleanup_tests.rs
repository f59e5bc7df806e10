//! Engine-level compare and cleanup tests, including the pin interplay
//! between a running diff and concurrent deletes.

use serde_json::json;
use strata_core::diff::model::DiffOptions;
use strata_core::errors::StrataErrorKind;
use strata_core::model::value::{records_from_json, FieldValue, Record};
use strata_engine::commands::{cleanup, compare};
use strata_store::{NewSnapshot, SnapshotStore};

fn records(value: serde_json::Value) -> Vec<Record> {
    records_from_json(value).unwrap()
}

fn store_with_two_versions() -> (SnapshotStore, String, String) {
    let store = SnapshotStore::open_in_memory().unwrap();
    let v1 = store
        .create_snapshot(NewSnapshot::new(
            "ds:items",
            records(json!([
                {"id": 1, "name": "A"},
                {"id": 2, "name": "B"}
            ])),
        ))
        .unwrap();
    let v2 = store
        .create_snapshot(NewSnapshot::new(
            "ds:items",
            records(json!([
                {"id": 1, "name": "A2"},
                {"id": 3, "name": "C"}
            ])),
        ))
        .unwrap();
    (store, v1.snapshot_id, v2.snapshot_id)
}

#[test]
fn test_compare_two_versions() {
    let (store, v1, v2) = store_with_two_versions();
    let comparison =
        compare::compare_snapshots(&store, &v1, &v2, "id", &DiffOptions::default()).unwrap();

    assert_eq!(comparison.counts.added, 1);
    assert_eq!(comparison.counts.removed, 1);
    assert_eq!(comparison.counts.modified, 1);
    assert_eq!(comparison.added[0]["id"], FieldValue::Number(3.0));
    assert_eq!(comparison.removed[0]["id"], FieldValue::Number(2.0));
    assert_eq!(comparison.modified[0].changes[0].field, "name");
}

#[test]
fn test_compare_missing_snapshot_is_not_found() {
    let (store, v1, _) = store_with_two_versions();
    let err = compare::compare_snapshots(&store, &v1, "snap:nope", "id", &DiffOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), StrataErrorKind::NotFound);
}

#[test]
fn test_compare_after_delete_fails_cleanly() {
    let (store, v1, v2) = store_with_two_versions();
    store.delete_snapshot(&v1).unwrap();
    let err =
        compare::compare_snapshots(&store, &v1, &v2, "id", &DiffOptions::default()).unwrap_err();
    assert_eq!(err.kind(), StrataErrorKind::NotFound);
}

#[test]
fn test_cleanup_command_reports_counts() {
    let store = SnapshotStore::open_in_memory().unwrap();
    for i in 0..5 {
        store
            .create_snapshot(NewSnapshot::new(
                "ds:history",
                records(json!([{"id": i}])),
            ))
            .unwrap();
    }
    let report = cleanup::cleanup(&store, "ds:history", 2).unwrap();
    assert_eq!(report.deleted_count, 3);
    assert_eq!(report.kept_count, 2);
}

#[test]
fn test_cleanup_never_touches_other_sources() {
    let store = SnapshotStore::open_in_memory().unwrap();
    for i in 0..3 {
        store
            .create_snapshot(NewSnapshot::new("ds:a", records(json!([{"id": i}]))))
            .unwrap();
        store
            .create_snapshot(NewSnapshot::new("ds:b", records(json!([{"id": i}]))))
            .unwrap();
    }
    cleanup::cleanup(&store, "ds:a", 1).unwrap();
    assert_eq!(
        store
            .list_by_data_source("ds:b", &Default::default())
            .unwrap()
            .len(),
        3
    );
}
