//! Snapshot comparison engine.
//!
//! The core entry point is [`compute_comparison`], which accepts the two
//! record sets, a comparison key, and options, and classifies every
//! record as added, removed, modified, or unchanged.
//!
//! Algorithm: build a normalized key → record index over the left side,
//! scan the right side once, then sweep the index for keys never visited
//! (removed). Runs in O(|A| + |B|) over a `BTreeMap` index.

#![allow(clippy::result_large_err)]

use crate::diff::model::{
    Comparison, DiffCounts, DiffDiagnostics, DiffOptions, DuplicateKeyPolicy, FieldChange,
    ModifiedEntry,
};
use crate::errors::{Result, StrataError, StrataErrorKind};
use crate::model::value::{FieldValue, Record};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Normalize the comparison key value of one record into its index string.
///
/// # Errors
///
/// - `Validation` — the key field is missing or null
/// - `Validation` — the key value is a nested object
fn normalized_key(record: &Record, key: &str, options: &DiffOptions) -> Result<String> {
    let value = record.get(key).ok_or_else(|| {
        StrataError::new(StrataErrorKind::Validation)
            .with_op("compute_comparison")
            .with_message(format!("comparison key '{}' is missing from a record", key))
    })?;

    match value {
        FieldValue::Null => Err(StrataError::new(StrataErrorKind::Validation)
            .with_op("compute_comparison")
            .with_message(format!("comparison key '{}' is null in a record", key))),
        FieldValue::Object(_) => Err(StrataError::new(StrataErrorKind::Validation)
            .with_op("compute_comparison")
            .with_message(format!(
                "comparison key '{}' is a nested object and cannot be indexed",
                key
            ))),
        FieldValue::Text(s) => {
            let mut normalized = if options.trim_strings {
                s.trim().to_string()
            } else {
                s.clone()
            };
            if !options.case_sensitive {
                normalized = normalized.to_lowercase();
            }
            Ok(normalized)
        }
        other => Ok(other
            .canonical_key()
            .expect("scalar values always have a canonical key")),
    }
}

/// Compute normalized keys for one side, recording duplicates.
///
/// Returns the per-record keys plus the sorted list of keys that occur
/// more than once.
fn keys_for_side(
    records: &[Record],
    key: &str,
    options: &DiffOptions,
) -> Result<(Vec<String>, Vec<String>)> {
    let mut keys = Vec::with_capacity(records.len());
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut duplicates: BTreeSet<String> = BTreeSet::new();

    for record in records {
        keys.push(normalized_key(record, key, options)?);
    }
    for k in &keys {
        if !seen.insert(k.as_str()) {
            duplicates.insert(k.clone());
        }
    }

    Ok((keys, duplicates.into_iter().collect()))
}

/// Compute the per-field changes between two records.
///
/// A field missing from one side compares as null. The change list is
/// sorted by field name (the field-name union of two BTreeMaps).
fn field_changes(before: &Record, after: &Record) -> Vec<FieldChange> {
    let names: BTreeSet<&str> = before
        .keys()
        .chain(after.keys())
        .map(|s| s.as_str())
        .collect();

    let mut changes = Vec::new();
    for name in names {
        let old = before.get(name).cloned().unwrap_or(FieldValue::Null);
        let new = after.get(name).cloned().unwrap_or(FieldValue::Null);
        if old != new {
            changes.push(FieldChange {
                field: name.to_string(),
                before: old,
                after: new,
            });
        }
    }
    changes
}

/// Compare two record sets by a key field.
///
/// Classification (scanning the right side against an index of the left):
///
/// - **added** — key absent from the left index
/// - **modified** — key present, at least one field differs (with a
///   per-field before/after list)
/// - **unchanged** — key present, all fields equal (listed only when
///   `include_unchanged` is set; always counted)
/// - **removed** — left keys never visited during the right scan
///
/// # Errors
///
/// - `Validation` — a record is missing the key field, or its key value
///   is null or a nested object
/// - `AmbiguousKey` — a key occurs more than once on either side and the
///   duplicate-key policy is `Fail`. Under `FirstWins` the first
///   occurrence wins and duplicates are reported in the diagnostics.
pub fn compute_comparison(
    left: &[Record],
    right: &[Record],
    comparison_key: &str,
    options: &DiffOptions,
) -> Result<Comparison> {
    let started = Instant::now();

    if comparison_key.is_empty() {
        return Err(StrataError::new(StrataErrorKind::Validation)
            .with_op("compute_comparison")
            .with_message("comparison key must not be empty"));
    }

    let (left_keys, duplicate_keys_left) = keys_for_side(left, comparison_key, options)?;
    let (right_keys, duplicate_keys_right) = keys_for_side(right, comparison_key, options)?;

    if options.duplicate_keys == DuplicateKeyPolicy::Fail {
        if !duplicate_keys_left.is_empty() || !duplicate_keys_right.is_empty() {
            let mut all: Vec<String> = duplicate_keys_left;
            all.extend(duplicate_keys_right);
            all.sort();
            all.dedup();
            return Err(StrataError::new(StrataErrorKind::AmbiguousKey)
                .with_op("compute_comparison")
                .with_message(format!(
                    "comparison key '{}' is not unique: {}",
                    comparison_key,
                    all.join(", ")
                )));
        }
    }

    // First-occurrence-wins index over the left side.
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, k) in left_keys.iter().enumerate() {
        index.entry(k.as_str()).or_insert(i);
    }

    let mut added: Vec<Record> = Vec::new();
    let mut modified: Vec<ModifiedEntry> = Vec::new();
    let mut unchanged: Vec<Record> = Vec::new();
    let mut unchanged_count = 0usize;
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut right_seen: BTreeSet<&str> = BTreeSet::new();

    for (record, key) in right.iter().zip(right_keys.iter()) {
        // Under FirstWins, later duplicate occurrences on the right are
        // ignored; they are already reported in the diagnostics.
        if !right_seen.insert(key.as_str()) {
            continue;
        }

        match index.get(key.as_str()) {
            None => added.push(record.clone()),
            Some(&left_idx) => {
                visited.insert(key.as_str());
                let before = &left[left_idx];
                let changes = field_changes(before, record);
                if changes.is_empty() {
                    unchanged_count += 1;
                    if options.include_unchanged {
                        unchanged.push(record.clone());
                    }
                } else {
                    modified.push(ModifiedEntry {
                        key: key.clone(),
                        before: before.clone(),
                        after: record.clone(),
                        changes,
                    });
                }
            }
        }
    }

    // Left keys never visited are removed; preserve left order and skip
    // non-first duplicate occurrences.
    let mut removed: Vec<Record> = Vec::new();
    let mut removed_seen: BTreeSet<&str> = BTreeSet::new();
    for (record, key) in left.iter().zip(left_keys.iter()) {
        if visited.contains(key.as_str()) {
            continue;
        }
        if removed_seen.insert(key.as_str()) {
            removed.push(record.clone());
        }
    }

    let counts = DiffCounts {
        added: added.len(),
        removed: removed.len(),
        modified: modified.len(),
        unchanged: unchanged_count,
    };

    Ok(Comparison {
        comparison_key: comparison_key.to_string(),
        counts,
        added,
        removed,
        modified,
        unchanged,
        diagnostics: DiffDiagnostics {
            duplicate_keys_left,
            duplicate_keys_right,
        },
        duration_ms: started.elapsed().as_millis() as u64,
    })
}
