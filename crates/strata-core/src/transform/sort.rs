//! Sort step: stable single-field sort.

use crate::model::pipeline::{SortConfig, SortDirection};
use crate::model::value::{cmp_values, FieldValue, Record};

/// Stable sort by one field. Missing fields compare as null, and null
/// orders lowest (so ascending puts nulls first). Ties preserve the
/// relative input order.
pub fn apply_sort(mut records: Vec<Record>, config: &SortConfig) -> Vec<Record> {
    records.sort_by(|a, b| {
        let va = a.get(&config.field).unwrap_or(&FieldValue::Null);
        let vb = b.get(&config.field).unwrap_or(&FieldValue::Null);
        let ordering = cmp_values(va, vb);
        match config.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::records_from_json;
    use serde_json::json;

    fn config(field: &str, direction: SortDirection) -> SortConfig {
        SortConfig {
            field: field.to_string(),
            direction,
        }
    }

    #[test]
    fn test_sort_ascending() {
        let records = records_from_json(json!([
            {"name": "Bob"}, {"name": "Al"}, {"name": "Cy"}
        ]))
        .unwrap();
        let sorted = apply_sort(records, &config("name", SortDirection::Asc));
        let names: Vec<_> = sorted.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(
            names,
            vec![
                FieldValue::Text("Al".to_string()),
                FieldValue::Text("Bob".to_string()),
                FieldValue::Text("Cy".to_string()),
            ]
        );
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let records = records_from_json(json!([
            {"k": 1, "tag": "first"},
            {"k": 0, "tag": "lowest"},
            {"k": 1, "tag": "second"}
        ]))
        .unwrap();
        let sorted = apply_sort(records, &config("k", SortDirection::Asc));
        assert_eq!(sorted[0]["tag"], FieldValue::Text("lowest".to_string()));
        assert_eq!(sorted[1]["tag"], FieldValue::Text("first".to_string()));
        assert_eq!(sorted[2]["tag"], FieldValue::Text("second".to_string()));
    }

    #[test]
    fn test_nulls_sort_first_ascending() {
        let records = records_from_json(json!([
            {"k": 2}, {"k": null}, {"k": 1}
        ]))
        .unwrap();
        let sorted = apply_sort(records, &config("k", SortDirection::Asc));
        assert_eq!(sorted[0]["k"], FieldValue::Null);
    }

    #[test]
    fn test_descending_reverses() {
        let records = records_from_json(json!([{"k": 1}, {"k": 3}, {"k": 2}])).unwrap();
        let sorted = apply_sort(records, &config("k", SortDirection::Desc));
        assert_eq!(sorted[0]["k"], FieldValue::Number(3.0));
        assert_eq!(sorted[2]["k"], FieldValue::Number(1.0));
    }
}
