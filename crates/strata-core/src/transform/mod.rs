//! Transform pipeline execution.
//!
//! One module per step kind, each exposing an `apply_*` function over a
//! record set; [`executor`] sequences them, refreshes the schema after
//! every step, and enforces atomicity and cooperative cancellation.
//! [`sandbox`] bounds user-supplied row transforms.

pub mod aggregate;
pub mod dedup;
pub mod executor;
pub mod filter;
pub mod join;
pub mod map;
pub mod sandbox;
pub mod sort;

pub use executor::{DatasetResolver, NoDatasets, PipelineExecutor, PipelineOutput, StaticDatasets};
pub use sandbox::{RowTransform, ScriptLimits, ScriptRegistry, ScriptResolver};

use crate::errors::{StrataError, StrataErrorKind};
use thiserror::Error;

/// Typed causes of transform-step failures.
///
/// Converted into the structured error facility at the executor boundary;
/// the executor adds the step index and kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("join key '{key}' is not unique in the {side} dataset (value '{value}')")]
    DuplicateJoinKey {
        key: String,
        side: String,
        value: String,
    },

    #[error("conflicting values for field '{field}' at join key '{key}'")]
    JoinConflict { field: String, key: String },

    #[error("no script named '{name}' is registered")]
    UnknownScript { name: String },

    #[error("script '{name}' exceeded its time budget of {budget_ms} ms")]
    ScriptTimeout { name: String, budget_ms: u64 },

    #[error("script '{name}' produced more than {max_rows} output rows")]
    ScriptOutputOverflow { name: String, max_rows: usize },

    #[error("script '{name}' failed: {message}")]
    ScriptFailed { name: String, message: String },
}

impl From<TransformError> for StrataError {
    fn from(err: TransformError) -> Self {
        let kind = match &err {
            TransformError::DuplicateJoinKey { .. } => StrataErrorKind::AmbiguousKey,
            _ => StrataErrorKind::StepExecution,
        };
        StrataError::new(kind).with_message(err.to_string())
    }
}
