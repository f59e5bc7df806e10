//! Map step: field renaming, derivation, and column drops.

use crate::model::pipeline::{FieldMapping, MapConfig, ValueTransform};
use crate::model::value::{canonical_number, FieldValue, Record};

/// Apply one mapping's transform to a value.
///
/// Returns the transformed value plus whether a lossy coercion happened
/// (a value that could not be converted and became null).
fn transform_value(value: FieldValue, transform: ValueTransform) -> (FieldValue, bool) {
    match transform {
        ValueTransform::Uppercase => match value {
            FieldValue::Text(s) => (FieldValue::Text(s.to_uppercase()), false),
            other => (other, false),
        },
        ValueTransform::Lowercase => match value {
            FieldValue::Text(s) => (FieldValue::Text(s.to_lowercase()), false),
            other => (other, false),
        },
        ValueTransform::Trim => match value {
            FieldValue::Text(s) => (FieldValue::Text(s.trim().to_string()), false),
            other => (other, false),
        },
        ValueTransform::ToNumber => match value {
            FieldValue::Number(n) => (FieldValue::Number(n), false),
            FieldValue::Bool(b) => (FieldValue::Number(if b { 1.0 } else { 0.0 }), false),
            FieldValue::Null => (FieldValue::Null, false),
            FieldValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => (FieldValue::Number(n), false),
                Err(_) => (FieldValue::Null, true),
            },
            FieldValue::Object(_) => (FieldValue::Null, true),
        },
        ValueTransform::ToText => match value {
            FieldValue::Text(s) => (FieldValue::Text(s), false),
            FieldValue::Null => (FieldValue::Null, false),
            FieldValue::Number(n) => (FieldValue::Text(canonical_number(n)), false),
            FieldValue::Bool(b) => (FieldValue::Text(b.to_string()), false),
            FieldValue::Object(o) => {
                let rendered = serde_json::to_string(&o).unwrap_or_default();
                (FieldValue::Text(rendered), false)
            }
        },
    }
}

fn apply_mapping(record: &mut Record, mapping: &FieldMapping) -> usize {
    // A source field absent from this record reads as null
    let value = record
        .get(&mapping.source_field)
        .cloned()
        .unwrap_or(FieldValue::Null);

    let (value, coerced) = match mapping.transform {
        Some(t) => transform_value(value, t),
        None => (value, false),
    };

    if mapping.target_field != mapping.source_field {
        record.remove(&mapping.source_field);
    }
    record.insert(mapping.target_field.clone(), value);

    usize::from(coerced)
}

/// Apply the map config to one record. Returns the coercion count.
pub fn map_record(record: &mut Record, config: &MapConfig) -> usize {
    let mut coercions = 0;
    for mapping in &config.mappings {
        coercions += apply_mapping(record, mapping);
    }
    for column in &config.drop {
        record.remove(column);
    }
    coercions
}

/// Apply the map config to a record set. Returns the records plus the
/// total coercion count.
pub fn apply_map(records: Vec<Record>, config: &MapConfig) -> (Vec<Record>, usize) {
    let mut coercions = 0;
    let mut out = records;
    for record in &mut out {
        coercions += map_record(record, config);
    }
    (out, coercions)
}
