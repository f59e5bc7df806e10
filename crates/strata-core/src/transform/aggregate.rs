//! Aggregate step: group-by plus sum/avg/count/min/max.
//!
//! Nulls are excluded from sum/avg/min/max but counted by count. Groups
//! are emitted in first-seen input order.

use crate::model::pipeline::{AggregateConfig, AggregateFunction, Aggregation};
use crate::model::value::{cmp_values, FieldValue, Record};
use std::collections::HashMap;

/// Accumulated state for one group.
struct GroupState {
    key_values: Vec<(String, FieldValue)>,
    members: Vec<usize>,
}

fn aggregate_one(records: &[Record], members: &[usize], aggregation: &Aggregation) -> FieldValue {
    let values = members
        .iter()
        .map(|&i| records[i].get(&aggregation.field).unwrap_or(&FieldValue::Null));

    match aggregation.function {
        AggregateFunction::Count => FieldValue::Number(members.len() as f64),
        AggregateFunction::Sum => {
            let numbers: Vec<f64> = values.filter_map(FieldValue::as_number).collect();
            if numbers.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Number(numbers.iter().sum())
            }
        }
        AggregateFunction::Avg => {
            let numbers: Vec<f64> = values.filter_map(FieldValue::as_number).collect();
            if numbers.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
        }
        AggregateFunction::Min => values
            .filter(|v| !v.is_null())
            .min_by(|a, b| cmp_values(a, b))
            .cloned()
            .unwrap_or(FieldValue::Null),
        AggregateFunction::Max => values
            .filter(|v| !v.is_null())
            .max_by(|a, b| cmp_values(a, b))
            .cloned()
            .unwrap_or(FieldValue::Null),
    }
}

/// Group the records and compute the configured aggregations.
///
/// The output carries one record per group: the group-by columns plus
/// one column per aggregation (named `output_field`, defaulting to the
/// source field name). An empty `group_by` produces a single global
/// group.
pub fn apply_aggregate(records: &[Record], config: &AggregateConfig) -> Vec<Record> {
    let mut groups: Vec<GroupState> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, record) in records.iter().enumerate() {
        let key_values: Vec<(String, FieldValue)> = config
            .group_by
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    record.get(name).cloned().unwrap_or(FieldValue::Null),
                )
            })
            .collect();
        // Group identity is the serialized key tuple; records are
        // BTreeMaps so this is deterministic.
        let group_key = serde_json::to_string(&key_values).unwrap_or_default();

        match index.get(&group_key) {
            Some(&g) => groups[g].members.push(i),
            None => {
                index.insert(group_key, groups.len());
                groups.push(GroupState {
                    key_values,
                    members: vec![i],
                });
            }
        }
    }

    // A global aggregate over zero records still yields no rows, which
    // matches grouped behavior (no groups observed).
    groups
        .into_iter()
        .map(|group| {
            let mut out = Record::new();
            for (name, value) in group.key_values {
                out.insert(name, value);
            }
            for aggregation in &config.aggregations {
                let output_field = aggregation
                    .output_field
                    .clone()
                    .unwrap_or_else(|| aggregation.field.clone());
                out.insert(
                    output_field,
                    aggregate_one(records, &group.members, aggregation),
                );
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::records_from_json;
    use serde_json::json;

    fn aggregation(field: &str, function: AggregateFunction) -> Aggregation {
        Aggregation {
            field: field.to_string(),
            function,
            output_field: None,
        }
    }

    #[test]
    fn test_group_sum() {
        let records = records_from_json(json!([
            {"category": "x", "amount": 5},
            {"category": "x", "amount": 7}
        ]))
        .unwrap();
        let config = AggregateConfig {
            group_by: vec!["category".to_string()],
            aggregations: vec![aggregation("amount", AggregateFunction::Sum)],
        };
        let out = apply_aggregate(&records, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["category"], FieldValue::Text("x".to_string()));
        assert_eq!(out[0]["amount"], FieldValue::Number(12.0));
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let records = records_from_json(json!([
            {"g": "b", "v": 1},
            {"g": "a", "v": 2},
            {"g": "b", "v": 3}
        ]))
        .unwrap();
        let config = AggregateConfig {
            group_by: vec!["g".to_string()],
            aggregations: vec![aggregation("v", AggregateFunction::Count)],
        };
        let out = apply_aggregate(&records, &config);
        assert_eq!(out[0]["g"], FieldValue::Text("b".to_string()));
        assert_eq!(out[1]["g"], FieldValue::Text("a".to_string()));
    }

    #[test]
    fn test_nulls_excluded_from_sum_but_counted() {
        let records = records_from_json(json!([
            {"g": "x", "v": 10},
            {"g": "x", "v": null},
            {"g": "x", "v": 20}
        ]))
        .unwrap();
        let config = AggregateConfig {
            group_by: vec!["g".to_string()],
            aggregations: vec![
                aggregation("v", AggregateFunction::Sum),
                Aggregation {
                    field: "v".to_string(),
                    function: AggregateFunction::Count,
                    output_field: Some("n".to_string()),
                },
                Aggregation {
                    field: "v".to_string(),
                    function: AggregateFunction::Avg,
                    output_field: Some("mean".to_string()),
                },
            ],
        };
        let out = apply_aggregate(&records, &config);
        assert_eq!(out[0]["v"], FieldValue::Number(30.0));
        assert_eq!(out[0]["n"], FieldValue::Number(3.0));
        assert_eq!(out[0]["mean"], FieldValue::Number(15.0));
    }

    #[test]
    fn test_all_null_min_yields_null() {
        let records = records_from_json(json!([{"g": 1, "v": null}])).unwrap();
        let config = AggregateConfig {
            group_by: vec!["g".to_string()],
            aggregations: vec![aggregation("v", AggregateFunction::Min)],
        };
        let out = apply_aggregate(&records, &config);
        assert_eq!(out[0]["v"], FieldValue::Null);
    }

    #[test]
    fn test_empty_group_by_is_one_global_group() {
        let records = records_from_json(json!([{"v": 1}, {"v": 2}])).unwrap();
        let config = AggregateConfig {
            group_by: vec![],
            aggregations: vec![aggregation("v", AggregateFunction::Max)],
        };
        let out = apply_aggregate(&records, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["v"], FieldValue::Number(2.0));
    }
}
