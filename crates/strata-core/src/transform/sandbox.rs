//! Bounded execution of user-supplied row transforms.
//!
//! Custom-script steps never embed host code in step configs. A step
//! names a [`RowTransform`] — a pure row-in/rows-out capability — that
//! the caller registered in a [`ScriptResolver`]. The sandbox runs the
//! transform under a wall-clock budget and an output-row cap and checks
//! the cancellation token between record batches. The capability surface
//! gives a transform no filesystem or network access to reach for.

use crate::errors::{Result, StrataError, StrataErrorKind};
use crate::model::value::Record;
use crate::transform::TransformError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_core_types::CancelToken;

/// Records per cancellation/budget check.
const BATCH_SIZE: usize = 256;

/// A pure row-in/rows-out user transformation.
///
/// Returning an empty vec drops the row; returning several expands it.
pub trait RowTransform: Send + Sync {
    fn apply(&self, record: &Record) -> std::result::Result<Vec<Record>, TransformError>;
}

impl<F> RowTransform for F
where
    F: Fn(&Record) -> std::result::Result<Vec<Record>, TransformError> + Send + Sync,
{
    fn apply(&self, record: &Record) -> std::result::Result<Vec<Record>, TransformError> {
        self(record)
    }
}

/// Resolves script names to registered transforms.
pub trait ScriptResolver {
    fn resolve(&self, name: &str) -> Option<Arc<dyn RowTransform>>;
}

/// A resolver with no scripts; custom-script steps fail against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScripts;

impl ScriptResolver for NoScripts {
    fn resolve(&self, _name: &str) -> Option<Arc<dyn RowTransform>> {
        None
    }
}

/// In-memory name → transform registry.
#[derive(Default)]
pub struct ScriptRegistry {
    scripts: BTreeMap<String, Arc<dyn RowTransform>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under a name, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, transform: Arc<dyn RowTransform>) {
        self.scripts.insert(name.into(), transform);
    }
}

impl ScriptResolver for ScriptRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn RowTransform>> {
        self.scripts.get(name).cloned()
    }
}

/// Resource limits applied to one script step.
#[derive(Debug, Clone, Copy)]
pub struct ScriptLimits {
    /// Wall-clock budget for the whole step
    pub time_budget: Duration,
    /// Cap on total output rows
    pub max_output_rows: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(5),
            max_output_rows: 1_000_000,
        }
    }
}

/// Run a named transform over a record set under the given limits.
///
/// # Errors
///
/// - `Cancelled` — the token was cancelled between batches
/// - `StepExecution` — the transform failed, ran past its time budget,
///   or overflowed the output-row cap (typed causes from
///   [`TransformError`])
pub fn run_script(
    name: &str,
    transform: &dyn RowTransform,
    records: &[Record],
    limits: &ScriptLimits,
    cancel: &CancelToken,
) -> Result<Vec<Record>> {
    let started = Instant::now();
    let mut out: Vec<Record> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        if i % BATCH_SIZE == 0 {
            if cancel.is_cancelled() {
                return Err(StrataError::new(StrataErrorKind::Cancelled)
                    .with_op("run_script")
                    .with_message("cancelled between script batches"));
            }
            if started.elapsed() > limits.time_budget {
                return Err(TransformError::ScriptTimeout {
                    name: name.to_string(),
                    budget_ms: limits.time_budget.as_millis() as u64,
                }
                .into());
            }
        }

        let produced = transform.apply(record).map_err(StrataError::from)?;
        out.extend(produced);

        if out.len() > limits.max_output_rows {
            return Err(TransformError::ScriptOutputOverflow {
                name: name.to_string(),
                max_rows: limits.max_output_rows,
            }
            .into());
        }
    }

    Ok(out)
}
