//! Filter step: AND-combined predicates.

use crate::model::pipeline::{FilterConfig, Predicate, PredicateOp};
use crate::model::value::{cmp_values, FieldValue, Record};
use std::cmp::Ordering;

/// True if the record satisfies every predicate in the config.
///
/// A field missing from the record evaluates as null.
pub fn matches_all(record: &Record, config: &FilterConfig) -> bool {
    config.predicates.iter().all(|p| matches(record, p))
}

fn matches(record: &Record, predicate: &Predicate) -> bool {
    let value = record.get(&predicate.field).unwrap_or(&FieldValue::Null);

    match predicate.op {
        PredicateOp::IsNull => value.is_null(),
        PredicateOp::IsNotNull => !value.is_null(),
        PredicateOp::Eq => cmp_values(value, &predicate.value) == Ordering::Equal,
        PredicateOp::Ne => cmp_values(value, &predicate.value) != Ordering::Equal,
        PredicateOp::Gt => cmp_values(value, &predicate.value) == Ordering::Greater,
        PredicateOp::Gte => cmp_values(value, &predicate.value) != Ordering::Less,
        PredicateOp::Lt => cmp_values(value, &predicate.value) == Ordering::Less,
        PredicateOp::Lte => cmp_values(value, &predicate.value) != Ordering::Greater,
        PredicateOp::Contains => match (value.as_text(), predicate.value.as_text()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        },
        PredicateOp::StartsWith => match (value.as_text(), predicate.value.as_text()) {
            (Some(haystack), Some(prefix)) => haystack.starts_with(prefix),
            _ => false,
        },
        PredicateOp::EndsWith => match (value.as_text(), predicate.value.as_text()) {
            (Some(haystack), Some(suffix)) => haystack.ends_with(suffix),
            _ => false,
        },
    }
}

/// Keep the records satisfying all predicates.
pub fn apply_filter(records: Vec<Record>, config: &FilterConfig) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| matches_all(r, config))
        .collect()
}
