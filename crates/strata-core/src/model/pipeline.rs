//! Pipeline definitions and the closed transform step union.
//!
//! A pipeline is a named, ordered list of transform steps. Each step is
//! one variant of [`TransformStep`] with its own strongly typed config,
//! dispatched through the executor's single `execute` path — a closed
//! sum type, not open-ended dynamic dispatch.

use crate::model::value::FieldValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, ordered sequence of transform steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique pipeline identifier (UUIDv7)
    pub id: String,
    pub name: String,
    /// Data source whose latest snapshot feeds the first step
    pub input_data_source_id: String,
    /// Data source that receives the output snapshot
    pub output_data_source_id: String,
    pub steps: Vec<TransformStep>,
}

impl Pipeline {
    /// Create an empty pipeline with a fresh id
    pub fn new(
        name: impl Into<String>,
        input_data_source_id: impl Into<String>,
        output_data_source_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            input_data_source_id: input_data_source_id.into(),
            output_data_source_id: output_data_source_id.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step, builder-style
    pub fn with_step(mut self, step: TransformStep) -> Self {
        self.steps.push(step);
        self
    }
}

/// One transform step (closed union, serde-tagged on `type`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformStep {
    Filter(FilterConfig),
    Map(MapConfig),
    Sort(SortConfig),
    Aggregate(AggregateConfig),
    Join(JoinConfig),
    Deduplicate(DedupConfig),
    CustomScript(ScriptConfig),
}

impl TransformStep {
    /// Stable step kind name, used in errors, logs, and lineage edges
    pub fn kind(&self) -> &'static str {
        match self {
            TransformStep::Filter(_) => "filter",
            TransformStep::Map(_) => "map",
            TransformStep::Sort(_) => "sort",
            TransformStep::Aggregate(_) => "aggregate",
            TransformStep::Join(_) => "join",
            TransformStep::Deduplicate(_) => "deduplicate",
            TransformStep::CustomScript(_) => "custom_script",
        }
    }
}

// ---- filter ----

/// AND-combined predicate list: a record passes only if every predicate
/// holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: PredicateOp,
    /// Comparison operand; ignored by is_null / is_not_null
    #[serde(default)]
    pub value: FieldValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
}

// ---- map ----

/// Field renaming/derivation. Mappings apply in order; a mapping whose
/// target differs from its source removes the source field (rename).
/// Columns listed in `drop` are removed after all mappings run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
    #[serde(default)]
    pub drop: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_field: String,
    pub target_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<ValueTransform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTransform {
    Uppercase,
    Lowercase,
    Trim,
    /// Parse text to a number; unparsable values become null and are
    /// counted as coercion warnings
    ToNumber,
    ToText,
}

// ---- sort ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

// ---- aggregate ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Group key columns; empty means one global group
    #[serde(default)]
    pub group_by: Vec<String>,
    pub aggregations: Vec<Aggregation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub field: String,
    pub function: AggregateFunction,
    /// Output column name; defaults to the source field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

// ---- join ----

/// Merge with a second dataset by key. The right side is resolved from
/// `data_source_id` (its latest snapshot) through the executor's dataset
/// resolver seam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    pub data_source_id: String,
    pub key: String,
    pub merge_type: MergeType,
    #[serde(default)]
    pub conflict_resolution: ConflictResolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeType {
    Inner,
    Left,
    Right,
    Outer,
    /// Concatenation with schema union; no key matching
    Union,
}

/// Policy for overlapping non-key fields when both sides carry a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    #[default]
    Left,
    Right,
    /// Prefer the non-null side; when both sides are non-null and
    /// unequal, the right side wins
    Merge,
    /// Fail the step on the first conflicting field
    Error,
}

// ---- deduplicate ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    pub keys: Vec<String>,
    #[serde(default)]
    pub keep: KeepRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepRule {
    #[default]
    First,
    Last,
}

// ---- custom script ----

/// A user transformation referenced by name. The executor resolves the
/// name through its script registry and runs the transform inside a
/// time- and output-bounded sandbox; configs never carry host code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub script: String,
}
