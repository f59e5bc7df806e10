//! Column schema and inference.
//!
//! A schema is an ordered list of `{name, column_type, nullable}` column
//! definitions inferred from records. It is recomputed after every
//! transform step rather than assumed fixed.
//!
//! Two inference modes exist:
//!
//! - [`infer_schema`] — strict; used at snapshot creation. Empty record
//!   sets, mixed-type columns, and all-null columns are rejected.
//! - [`refresh_schema`] — lenient; used between pipeline steps, where an
//!   intermediate dataset may legitimately be empty or carry all-null
//!   columns. Falls back to the previous schema's definition.

use crate::errors::{Result, StrataError, StrataErrorKind};
use crate::model::value::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Number,
    Boolean,
    Object,
}

impl ColumnType {
    /// Classify a non-null value. Returns `None` for `Null`.
    pub fn of(value: &FieldValue) -> Option<ColumnType> {
        match value {
            FieldValue::Null => None,
            FieldValue::Bool(_) => Some(ColumnType::Boolean),
            FieldValue::Number(_) => Some(ColumnType::Number),
            FieldValue::Text(_) => Some(ColumnType::Text),
            FieldValue::Object(_) => Some(ColumnType::Object),
        }
    }

    /// Stable name used in error messages and serialized schemas
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Object => "object",
        }
    }
}

/// One column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

/// An ordered list of column definitions.
///
/// Column order is first-seen order across the record set and is the
/// presentation order for paginated record views.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in presentation order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Per-column observation state accumulated during a scan.
#[derive(Default)]
struct ColumnObservation {
    types: Vec<ColumnType>,
    saw_null: bool,
    present_in: usize,
}

fn observe(records: &[Record]) -> (Vec<String>, BTreeMap<String, ColumnObservation>) {
    let mut order: Vec<String> = Vec::new();
    let mut observations: BTreeMap<String, ColumnObservation> = BTreeMap::new();

    for record in records {
        for (name, value) in record {
            let entry = observations.entry(name.clone()).or_insert_with(|| {
                order.push(name.clone());
                ColumnObservation::default()
            });
            entry.present_in += 1;
            match ColumnType::of(value) {
                None => entry.saw_null = true,
                Some(t) => {
                    if !entry.types.contains(&t) {
                        entry.types.push(t);
                    }
                }
            }
        }
    }

    (order, observations)
}

/// Infer a schema from a record set (strict).
///
/// # Errors
///
/// `SchemaInference` —
/// - the record set is empty,
/// - a column carries more than one non-null type,
/// - a column carries only null values (its type is ambiguous).
pub fn infer_schema(records: &[Record]) -> Result<Schema> {
    if records.is_empty() {
        return Err(StrataError::new(StrataErrorKind::SchemaInference)
            .with_op("infer_schema")
            .with_message("cannot infer a schema from an empty record set"));
    }

    let (order, observations) = observe(records);
    let mut columns = Vec::with_capacity(order.len());

    for name in order {
        let obs = &observations[&name];
        let column_type = match obs.types.as_slice() {
            [single] => *single,
            [] => {
                return Err(StrataError::new(StrataErrorKind::SchemaInference)
                    .with_op("infer_schema")
                    .with_message(format!(
                        "column '{}' has only null values; its type is ambiguous",
                        name
                    )));
            }
            several => {
                let names: Vec<&str> = several.iter().map(ColumnType::name).collect();
                return Err(StrataError::new(StrataErrorKind::SchemaInference)
                    .with_op("infer_schema")
                    .with_message(format!(
                        "column '{}' has inconsistent types: {}",
                        name,
                        names.join(", ")
                    )));
            }
        };
        let nullable = obs.saw_null || obs.present_in < records.len();
        columns.push(ColumnDef {
            name,
            column_type,
            nullable,
        });
    }

    Ok(Schema { columns })
}

/// Re-derive a schema between pipeline steps (lenient).
///
/// - Empty dataset → the previous schema is carried forward.
/// - All-null column → the previous definition is reused if present,
///   otherwise nullable text.
/// - Mixed-type column → nullable text (widest rendering).
pub fn refresh_schema(records: &[Record], previous: &Schema) -> Schema {
    if records.is_empty() {
        return previous.clone();
    }

    let (order, observations) = observe(records);
    let mut columns = Vec::with_capacity(order.len());

    for name in order {
        let obs = &observations[&name];
        let nullable =
            obs.saw_null || obs.present_in < records.len() || obs.types.is_empty();
        let column_type = match obs.types.as_slice() {
            [single] => *single,
            [] => previous
                .column(&name)
                .map(|c| c.column_type)
                .unwrap_or(ColumnType::Text),
            _ => ColumnType::Text,
        };
        columns.push(ColumnDef {
            name,
            column_type,
            nullable,
        });
    }

    Schema { columns }
}
