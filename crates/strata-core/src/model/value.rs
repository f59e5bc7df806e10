//! Dynamic field values and records.
//!
//! Records carry arbitrary row shapes, so every field value is a closed
//! tagged union over the supported scalar types plus nested objects.
//! Records are `BTreeMap`s: serialization is deterministic and equality
//! is structural. Column *presentation* order is a schema concern, not a
//! record concern.

use crate::errors::{Result, StrataError, StrataErrorKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One row: field name → typed value.
pub type Record = BTreeMap<String, FieldValue>;

/// A typed field value.
///
/// Serializes untagged, so records round-trip through plain JSON objects.
/// Arrays are intentionally not representable; boundary conversion
/// rejects them as validation errors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// True for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Stable name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::Object(_) => "object",
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view of the value, if it has one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Canonical string form for scalar values, used as a join/dedup key.
    ///
    /// Returns `None` for `Null` and `Object`, which cannot act as keys.
    pub fn canonical_key(&self) -> Option<String> {
        match self {
            FieldValue::Null | FieldValue::Object(_) => None,
            FieldValue::Bool(b) => Some(if *b { "true".into() } else { "false".into() }),
            FieldValue::Number(n) => Some(canonical_number(*n)),
            FieldValue::Text(s) => Some(s.clone()),
        }
    }
}

/// Render a number without a trailing `.0` when it is integral.
///
/// Keeps `1` and `1.0` on the same side of a key index.
pub fn canonical_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Total ordering over field values.
///
/// Values of different types order by type rank
/// (null < boolean < number < text < object); values of the same type
/// order naturally. Used by sort steps, predicates, and min/max
/// aggregation, so all three agree on one ordering.
pub fn cmp_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    fn rank(v: &FieldValue) -> u8 {
        match v {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Number(_) => 2,
            FieldValue::Text(_) => 3,
            FieldValue::Object(_) => 4,
        }
    }

    match (a, b) {
        (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        (FieldValue::Number(x), FieldValue::Number(y)) => x.total_cmp(y),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Object(x), FieldValue::Object(y)) => cmp_objects(x, y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn cmp_objects(a: &BTreeMap<String, FieldValue>, b: &BTreeMap<String, FieldValue>) -> Ordering {
    let mut left = a.iter();
    let mut right = b.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((ka, va)), Some((kb, vb))) => {
                let by_key = ka.cmp(kb);
                if by_key != Ordering::Equal {
                    return by_key;
                }
                let by_value = cmp_values(va, vb);
                if by_value != Ordering::Equal {
                    return by_value;
                }
            }
        }
    }
}

/// Convert a JSON value into a [`FieldValue`].
///
/// # Errors
///
/// `Validation` — the value is or contains an array, which the record
/// model does not represent.
pub fn field_value_from_json(value: serde_json::Value) -> Result<FieldValue> {
    match value {
        serde_json::Value::Null => Ok(FieldValue::Null),
        serde_json::Value::Bool(b) => Ok(FieldValue::Bool(b)),
        serde_json::Value::Number(n) => {
            let as_f64 = n.as_f64().ok_or_else(|| {
                StrataError::new(StrataErrorKind::Validation)
                    .with_op("field_value_from_json")
                    .with_message(format!("number out of range: {}", n))
            })?;
            Ok(FieldValue::Number(as_f64))
        }
        serde_json::Value::String(s) => Ok(FieldValue::Text(s)),
        serde_json::Value::Object(map) => {
            let mut fields = BTreeMap::new();
            for (k, v) in map {
                fields.insert(k, field_value_from_json(v)?);
            }
            Ok(FieldValue::Object(fields))
        }
        serde_json::Value::Array(_) => Err(StrataError::new(StrataErrorKind::Validation)
            .with_op("field_value_from_json")
            .with_message("array values are not supported in records")),
    }
}

/// Convert a JSON object into a [`Record`].
///
/// # Errors
///
/// `Validation` — the value is not an object, or a field contains an array.
pub fn record_from_json(value: serde_json::Value) -> Result<Record> {
    match value {
        serde_json::Value::Object(map) => {
            let mut record = Record::new();
            for (k, v) in map {
                record.insert(k, field_value_from_json(v)?);
            }
            Ok(record)
        }
        other => Err(StrataError::new(StrataErrorKind::Validation)
            .with_op("record_from_json")
            .with_message(format!("expected a JSON object, got {}", json_type(&other)))),
    }
}

/// Convert a JSON array of objects into a record set.
///
/// # Errors
///
/// `Validation` — the value is not an array, or any element is not a
/// valid record.
pub fn records_from_json(value: serde_json::Value) -> Result<Vec<Record>> {
    match value {
        serde_json::Value::Array(items) => items.into_iter().map(record_from_json).collect(),
        other => Err(StrataError::new(StrataErrorKind::Validation)
            .with_op("records_from_json")
            .with_message(format!("expected a JSON array, got {}", json_type(&other)))),
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_untagged_round_trip() {
        let record: Record = serde_json::from_value(json!({
            "id": 1, "name": "A", "active": true, "note": null,
            "extra": {"depth": 2.5}
        }))
        .unwrap();
        assert_eq!(record["id"], FieldValue::Number(1.0));
        assert_eq!(record["name"], FieldValue::Text("A".to_string()));
        assert_eq!(record["active"], FieldValue::Bool(true));
        assert_eq!(record["note"], FieldValue::Null);
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["extra"]["depth"], json!(2.5));
    }

    #[test]
    fn test_from_json_rejects_arrays() {
        let err = record_from_json(json!({"tags": [1, 2]})).unwrap_err();
        assert_eq!(err.kind(), StrataErrorKind::Validation);
    }

    #[test]
    fn test_cmp_orders_types_by_rank() {
        let null = FieldValue::Null;
        let boolean = FieldValue::Bool(true);
        let number = FieldValue::Number(0.0);
        let text = FieldValue::Text("a".to_string());
        assert_eq!(cmp_values(&null, &boolean), Ordering::Less);
        assert_eq!(cmp_values(&boolean, &number), Ordering::Less);
        assert_eq!(cmp_values(&number, &text), Ordering::Less);
    }

    #[test]
    fn test_cmp_numbers_naturally() {
        assert_eq!(
            cmp_values(&FieldValue::Number(2.0), &FieldValue::Number(10.0)),
            Ordering::Less
        );
    }

    #[test]
    fn test_canonical_number_drops_integral_fraction() {
        assert_eq!(canonical_number(42.0), "42");
        assert_eq!(canonical_number(2.5), "2.5");
    }

    #[test]
    fn test_canonical_key_for_scalars_only() {
        assert_eq!(
            FieldValue::Number(7.0).canonical_key(),
            Some("7".to_string())
        );
        assert_eq!(FieldValue::Null.canonical_key(), None);
        assert_eq!(FieldValue::Object(BTreeMap::new()).canonical_key(), None);
    }
}
