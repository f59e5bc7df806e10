//! Snapshot comparison output types.
//!
//! All types implement `Debug, Clone, Serialize, Deserialize, PartialEq`.
//! Lists preserve input-scan order and maps are `BTreeMap`s, so serialized
//! comparisons are deterministic.

use crate::model::value::{FieldValue, Record};
use serde::{Deserialize, Serialize};

/// Options controlling a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Include the unchanged record list in the output
    /// (the unchanged *count* is always reported)
    #[serde(default)]
    pub include_unchanged: bool,
    /// Trim surrounding whitespace from text keys before matching
    #[serde(default)]
    pub trim_strings: bool,
    /// Compare text keys case-sensitively
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    /// What to do when the comparison key is not unique within a side
    #[serde(default)]
    pub duplicate_keys: DuplicateKeyPolicy,
}

fn default_case_sensitive() -> bool {
    true
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_unchanged: false,
            trim_strings: false,
            case_sensitive: true,
            duplicate_keys: DuplicateKeyPolicy::default(),
        }
    }
}

/// Duplicate-key handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Reject the comparison with an AmbiguousKey error
    #[default]
    Fail,
    /// Keep the first occurrence per key; report every duplicate key in
    /// the diagnostics
    FirstWins,
}

/// Before/after values for one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: FieldValue,
    pub after: FieldValue,
}

/// A record present on both sides whose fields differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedEntry {
    /// Normalized comparison key
    pub key: String,
    pub before: Record,
    pub after: Record,
    /// Per-field changes, sorted by field name
    pub changes: Vec<FieldChange>,
}

/// Classification counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffCounts {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

/// Non-fatal observations made during the comparison.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffDiagnostics {
    /// Normalized keys occurring more than once on the left side
    pub duplicate_keys_left: Vec<String>,
    /// Normalized keys occurring more than once on the right side
    pub duplicate_keys_right: Vec<String>,
}

impl DiffDiagnostics {
    pub fn is_empty(&self) -> bool {
        self.duplicate_keys_left.is_empty() && self.duplicate_keys_right.is_empty()
    }
}

/// The result of comparing two record sets by a key field.
///
/// Owned transiently by the caller; the engine itself persists nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub comparison_key: String,
    pub counts: DiffCounts,
    /// Records whose key is present only on the right side (right-scan order)
    pub added: Vec<Record>,
    /// Records whose key is present only on the left side (left order)
    pub removed: Vec<Record>,
    /// Records present on both sides with differing fields (right-scan order)
    pub modified: Vec<ModifiedEntry>,
    /// Populated only when `include_unchanged` is set
    #[serde(default)]
    pub unchanged: Vec<Record>,
    #[serde(default)]
    pub diagnostics: DiffDiagnostics,
    pub duration_ms: u64,
}
