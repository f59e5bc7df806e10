//! Deduplicate step: key-based, keeping first or last occurrence.

use crate::model::pipeline::{DedupConfig, KeepRule};
use crate::model::value::{FieldValue, Record};
use std::collections::HashMap;
use std::collections::HashSet;

/// Dedup key: serialized tuple of the key field values (null/missing
/// fields participate as null, so records without the key still group).
fn dedup_key(record: &Record, keys: &[String]) -> String {
    let values: Vec<&FieldValue> = keys
        .iter()
        .map(|k| record.get(k).unwrap_or(&FieldValue::Null))
        .collect();
    serde_json::to_string(&values).unwrap_or_default()
}

/// Keep one record per key. `First` keeps the first occurrence in input
/// order; `Last` keeps the last occurrence, at its original position.
pub fn apply_dedup(records: Vec<Record>, config: &DedupConfig) -> Vec<Record> {
    match config.keep {
        KeepRule::First => {
            let mut seen: HashSet<String> = HashSet::new();
            records
                .into_iter()
                .filter(|r| seen.insert(dedup_key(r, &config.keys)))
                .collect()
        }
        KeepRule::Last => {
            let mut last_index: HashMap<String, usize> = HashMap::new();
            for (i, record) in records.iter().enumerate() {
                last_index.insert(dedup_key(record, &config.keys), i);
            }
            records
                .into_iter()
                .enumerate()
                .filter(|(i, r)| last_index[&dedup_key(r, &config.keys)] == *i)
                .map(|(_, r)| r)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::records_from_json;
    use serde_json::json;

    fn config(keep: KeepRule) -> DedupConfig {
        DedupConfig {
            keys: vec!["id".to_string()],
            keep,
        }
    }

    #[test]
    fn test_keep_first() {
        let records = records_from_json(json!([
            {"id": 1, "v": "first"},
            {"id": 2, "v": "only"},
            {"id": 1, "v": "second"}
        ]))
        .unwrap();
        let out = apply_dedup(records, &config(KeepRule::First));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["v"], FieldValue::Text("first".to_string()));
    }

    #[test]
    fn test_keep_last() {
        let records = records_from_json(json!([
            {"id": 1, "v": "first"},
            {"id": 2, "v": "only"},
            {"id": 1, "v": "second"}
        ]))
        .unwrap();
        let out = apply_dedup(records, &config(KeepRule::Last));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["v"], FieldValue::Text("only".to_string()));
        assert_eq!(out[1]["v"], FieldValue::Text("second".to_string()));
    }

    #[test]
    fn test_missing_key_groups_as_null() {
        let records = records_from_json(json!([
            {"id": null, "v": 1},
            {"v": 2}
        ]))
        .unwrap();
        let out = apply_dedup(records, &config(KeepRule::First));
        assert_eq!(out.len(), 1);
    }
}
