//! Join step: merge with a second dataset by key.
//!
//! The indexed side of a join must have a unique key; a duplicate is an
//! ambiguous-key failure, the same rule the diff engine applies to its
//! comparison key. Records whose key is null or missing never match; an
//! inner join drops them, the outer variants pass them through.

use crate::model::pipeline::{ConflictResolution, JoinConfig, MergeType};
use crate::model::value::Record;
use crate::transform::TransformError;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Key string for one record, `None` when the key is null/missing or not
/// a scalar.
fn join_key(record: &Record, key: &str) -> Option<String> {
    record.get(key).and_then(|v| v.canonical_key())
}

/// Index one side by key, failing on duplicates.
fn index_side<'a>(
    records: &'a [Record],
    key: &str,
    side: &str,
) -> Result<BTreeMap<String, &'a Record>, TransformError> {
    let mut index: BTreeMap<String, &Record> = BTreeMap::new();
    for record in records {
        if let Some(k) = join_key(record, key) {
            if index.insert(k.clone(), record).is_some() {
                return Err(TransformError::DuplicateJoinKey {
                    key: key.to_string(),
                    side: side.to_string(),
                    value: k,
                });
            }
        }
    }
    Ok(index)
}

/// Merge a matched pair. `primary` supplies the base record; fields from
/// `secondary` are folded in under the conflict policy. The policy is
/// expressed left/right regardless of which side is primary.
fn merge_pair(
    left: &Record,
    right: &Record,
    key: &str,
    join_key_value: &str,
    resolution: ConflictResolution,
) -> Result<Record, TransformError> {
    let mut out = left.clone();
    for (field, right_value) in right {
        match out.get(field) {
            None => {
                out.insert(field.clone(), right_value.clone());
            }
            Some(left_value) if left_value == right_value => {}
            Some(left_value) => {
                if field.as_str() == key {
                    // Join keys matched by construction; normalize wins
                    continue;
                }
                match resolution {
                    ConflictResolution::Left => {}
                    ConflictResolution::Right => {
                        out.insert(field.clone(), right_value.clone());
                    }
                    ConflictResolution::Merge => {
                        // Prefer the non-null side; both non-null and
                        // unequal → right wins
                        if left_value.is_null() || !right_value.is_null() {
                            out.insert(field.clone(), right_value.clone());
                        }
                    }
                    ConflictResolution::Error => {
                        return Err(TransformError::JoinConflict {
                            field: field.clone(),
                            key: join_key_value.to_string(),
                        });
                    }
                }
            }
        }
    }
    Ok(out)
}

/// Merge two record sets per the join config.
pub fn apply_join(
    left: Vec<Record>,
    right: Vec<Record>,
    config: &JoinConfig,
) -> Result<Vec<Record>, TransformError> {
    match config.merge_type {
        MergeType::Union => {
            // Concatenation with schema union; no key matching
            let mut out = left;
            out.extend(right);
            Ok(out)
        }
        MergeType::Inner | MergeType::Left | MergeType::Outer => {
            let right_index = index_side(&right, &config.key, "right")?;
            let mut out = Vec::new();
            let mut matched_right: BTreeSet<String> = BTreeSet::new();

            for record in &left {
                match join_key(record, &config.key) {
                    Some(k) => match right_index.get(&k) {
                        Some(partner) => {
                            matched_right.insert(k.clone());
                            out.push(merge_pair(
                                record,
                                partner,
                                &config.key,
                                &k,
                                config.conflict_resolution,
                            )?);
                        }
                        None => {
                            if config.merge_type != MergeType::Inner {
                                out.push(record.clone());
                            }
                        }
                    },
                    None => {
                        if config.merge_type != MergeType::Inner {
                            out.push(record.clone());
                        }
                    }
                }
            }

            if config.merge_type == MergeType::Outer {
                for record in &right {
                    let matched = join_key(record, &config.key)
                        .map(|k| matched_right.contains(&k))
                        .unwrap_or(false);
                    if !matched {
                        out.push(record.clone());
                    }
                }
            }

            Ok(out)
        }
        MergeType::Right => {
            let left_index = index_side(&left, &config.key, "left")?;
            let mut out = Vec::new();
            for record in &right {
                match join_key(record, &config.key).and_then(|k| {
                    left_index.get(&k).map(|partner| (k, *partner))
                }) {
                    Some((k, partner)) => {
                        out.push(merge_pair(
                            partner,
                            record,
                            &config.key,
                            &k,
                            config.conflict_resolution,
                        )?);
                    }
                    None => out.push(record.clone()),
                }
            }
            Ok(out)
        }
    }
}
