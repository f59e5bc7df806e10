//! Pure diff unit tests — record-set comparison scenarios.
//!
//! All tests operate exclusively on in-memory record sets (no I/O, no DB).

use strata_core::diff::engine::compute_comparison;
use strata_core::diff::model::{DiffOptions, DuplicateKeyPolicy};
use strata_core::errors::StrataErrorKind;
use strata_core::model::value::{records_from_json, FieldValue, Record};

use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn records(value: serde_json::Value) -> Vec<Record> {
    records_from_json(value).unwrap()
}

fn options() -> DiffOptions {
    DiffOptions::default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// S1: the canonical added/removed/modified scenario
#[test]
fn test_added_removed_modified_classification() {
    let v1 = records(json!([
        {"id": 1, "name": "A"},
        {"id": 2, "name": "B"}
    ]));
    let v2 = records(json!([
        {"id": 1, "name": "A2"},
        {"id": 3, "name": "C"}
    ]));

    let comparison = compute_comparison(&v1, &v2, "id", &options()).unwrap();

    assert_eq!(comparison.counts.added, 1);
    assert_eq!(comparison.counts.removed, 1);
    assert_eq!(comparison.counts.modified, 1);
    assert_eq!(comparison.counts.unchanged, 0);

    assert_eq!(comparison.added[0]["id"], FieldValue::Number(3.0));
    assert_eq!(comparison.removed[0]["id"], FieldValue::Number(2.0));

    let modified = &comparison.modified[0];
    assert_eq!(modified.key, "1");
    assert_eq!(modified.changes.len(), 1);
    assert_eq!(modified.changes[0].field, "name");
    assert_eq!(modified.changes[0].before, FieldValue::Text("A".to_string()));
    assert_eq!(modified.changes[0].after, FieldValue::Text("A2".to_string()));
}

// S2: comparing a snapshot against itself yields only unchanged records
#[test]
fn test_self_comparison_is_all_unchanged() {
    let set = records(json!([{"id": 1, "v": "x"}, {"id": 2, "v": "y"}]));
    let opts = DiffOptions {
        include_unchanged: true,
        ..options()
    };
    let comparison = compute_comparison(&set, &set, "id", &opts).unwrap();
    assert_eq!(comparison.counts.added, 0);
    assert_eq!(comparison.counts.removed, 0);
    assert_eq!(comparison.counts.modified, 0);
    assert_eq!(comparison.counts.unchanged, 2);
    assert_eq!(comparison.unchanged.len(), 2);
}

// S3: unchanged records are counted even when the list is excluded
#[test]
fn test_unchanged_count_without_list() {
    let set = records(json!([{"id": 1, "v": "x"}]));
    let comparison = compute_comparison(&set, &set, "id", &options()).unwrap();
    assert_eq!(comparison.counts.unchanged, 1);
    assert!(comparison.unchanged.is_empty());
}

// S4: diff symmetry — added and removed swap when the sides swap
#[test]
fn test_symmetry_of_added_and_removed() {
    let a = records(json!([{"id": 1}, {"id": 2}, {"id": 4}]));
    let b = records(json!([{"id": 2}, {"id": 3}]));

    let forward = compute_comparison(&a, &b, "id", &options()).unwrap();
    let backward = compute_comparison(&b, &a, "id", &options()).unwrap();

    assert_eq!(forward.added, backward.removed);
    assert_eq!(forward.removed, backward.added);
    assert_eq!(forward.counts.modified, backward.counts.modified);
}

// S5: reconciliation identity |A| + added - removed == |B|
#[test]
fn test_reconciliation_identity() {
    let a = records(json!([{"id": 1}, {"id": 2}, {"id": 3}]));
    let b = records(json!([{"id": 2, "v": 1}, {"id": 3}, {"id": 4}, {"id": 5}]));
    let opts = DiffOptions {
        include_unchanged: true,
        ..options()
    };
    let comparison = compute_comparison(&a, &b, "id", &opts).unwrap();
    assert_eq!(
        a.len() + comparison.counts.added - comparison.counts.removed,
        b.len()
    );
}

// S6: text keys normalize under trim_strings / case_sensitive
#[test]
fn test_key_normalization_options() {
    let a = records(json!([{"code": "  ab  ", "v": 1}]));
    let b = records(json!([{"code": "AB", "v": 1}]));

    // Strict: no match at all
    let strict = compute_comparison(&a, &b, "code", &options()).unwrap();
    assert_eq!(strict.counts.added, 1);
    assert_eq!(strict.counts.removed, 1);

    // Trimmed + case-insensitive: the records match (and the stored
    // code fields still differ, so the record is modified)
    let lax = DiffOptions {
        trim_strings: true,
        case_sensitive: false,
        ..options()
    };
    let relaxed = compute_comparison(&a, &b, "code", &lax).unwrap();
    assert_eq!(relaxed.counts.added, 0);
    assert_eq!(relaxed.counts.removed, 0);
    assert_eq!(relaxed.counts.modified, 1);
}

// S7: numeric keys index identically whether written 1 or 1.0
#[test]
fn test_numeric_key_canonicalization() {
    let a = records(json!([{"id": 1, "v": "x"}]));
    let b = records(json!([{"id": 1.0, "v": "x"}]));
    let opts = DiffOptions {
        include_unchanged: true,
        ..options()
    };
    let comparison = compute_comparison(&a, &b, "id", &opts).unwrap();
    assert_eq!(comparison.counts.unchanged, 1);
}

// S8: duplicate keys fail by default
#[test]
fn test_duplicate_keys_fail_policy() {
    let a = records(json!([{"id": 1}, {"id": 1}]));
    let b = records(json!([{"id": 2}]));
    let err = compute_comparison(&a, &b, "id", &options()).unwrap_err();
    assert_eq!(err.kind(), StrataErrorKind::AmbiguousKey);
    assert!(err.message().contains("'id'"));
}

// S9: first-occurrence-wins with duplicates reported in diagnostics
#[test]
fn test_duplicate_keys_first_wins_policy() {
    let a = records(json!([
        {"id": 1, "v": "first"},
        {"id": 1, "v": "shadowed"}
    ]));
    let b = records(json!([{"id": 1, "v": "first"}]));
    let opts = DiffOptions {
        include_unchanged: true,
        duplicate_keys: DuplicateKeyPolicy::FirstWins,
        ..options()
    };
    let comparison = compute_comparison(&a, &b, "id", &opts).unwrap();
    // The first occurrence matched; the shadowed duplicate is neither
    // removed nor modified
    assert_eq!(comparison.counts.unchanged, 1);
    assert_eq!(comparison.counts.removed, 0);
    assert_eq!(comparison.diagnostics.duplicate_keys_left, vec!["1"]);
    assert!(comparison.diagnostics.duplicate_keys_right.is_empty());
}

// S10: a record missing the comparison key rejects the whole comparison
#[test]
fn test_missing_key_is_validation_error() {
    let a = records(json!([{"id": 1}, {"name": "no id"}]));
    let b = records(json!([{"id": 1}]));
    let err = compute_comparison(&a, &b, "id", &options()).unwrap_err();
    assert_eq!(err.kind(), StrataErrorKind::Validation);
}

// S11: a null key rejects the comparison
#[test]
fn test_null_key_is_validation_error() {
    let a = records(json!([{"id": null}]));
    let b = records(json!([{"id": 1}]));
    let err = compute_comparison(&a, &b, "id", &options()).unwrap_err();
    assert_eq!(err.kind(), StrataErrorKind::Validation);
}

// S12: fields missing from one side compare as null in the change list
#[test]
fn test_field_missing_from_one_side_is_null_change() {
    let a = records(json!([{"id": 1, "old_col": "x"}]));
    let b = records(json!([{"id": 1, "new_col": "y"}]));
    let comparison = compute_comparison(&a, &b, "id", &options()).unwrap();
    let changes = &comparison.modified[0].changes;
    let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["new_col", "old_col"]);
    assert_eq!(changes[0].before, FieldValue::Null);
    assert_eq!(changes[1].after, FieldValue::Null);
}

// S13: the comparison is deterministic
#[test]
fn test_comparison_is_deterministic() {
    let a = records(json!([{"id": 1, "v": 1}, {"id": 2, "v": 2}]));
    let b = records(json!([{"id": 2, "v": 3}, {"id": 4, "v": 4}]));
    let first = compute_comparison(&a, &b, "id", &options()).unwrap();
    let second = compute_comparison(&a, &b, "id", &options()).unwrap();
    // Everything except the wall-clock duration must match exactly
    assert_eq!(first.counts, second.counts);
    assert_eq!(first.added, second.added);
    assert_eq!(first.removed, second.removed);
    assert_eq!(first.modified, second.modified);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn keyed_records(keys: &BTreeSet<i64>, multiplier: i64) -> Vec<Record> {
    keys.iter()
        .map(|k| {
            records_from_json(json!([{"id": k, "v": k * multiplier}]))
                .unwrap()
                .remove(0)
        })
        .collect()
}

proptest! {
    // With unique keys, |A| + added - removed == |B| for any two sides
    #[test]
    fn prop_reconciliation_identity(
        left_keys in prop::collection::btree_set(0i64..60, 0..25),
        right_keys in prop::collection::btree_set(0i64..60, 0..25),
    ) {
        let a = keyed_records(&left_keys, 2);
        let b = keyed_records(&right_keys, 3);
        let opts = DiffOptions { include_unchanged: true, ..DiffOptions::default() };
        let comparison = compute_comparison(&a, &b, "id", &opts).unwrap();
        prop_assert_eq!(
            a.len() + comparison.counts.added - comparison.counts.removed,
            b.len()
        );
        prop_assert_eq!(
            comparison.counts.added
                + comparison.counts.modified
                + comparison.counts.unchanged,
            b.len()
        );
    }

    // Symmetry holds for arbitrary unique-keyed sides
    #[test]
    fn prop_symmetry(
        left_keys in prop::collection::btree_set(0i64..40, 0..20),
        right_keys in prop::collection::btree_set(0i64..40, 0..20),
    ) {
        let a = keyed_records(&left_keys, 2);
        let b = keyed_records(&right_keys, 2);
        let opts = DiffOptions::default();
        let forward = compute_comparison(&a, &b, "id", &opts).unwrap();
        let backward = compute_comparison(&b, &a, "id", &opts).unwrap();
        prop_assert_eq!(forward.added, backward.removed);
        prop_assert_eq!(forward.removed, backward.added);
    }
}
