//! Pipeline step executor.
//!
//! Steps run strictly in sequence; each step's output dataset is the
//! next step's input, and the schema is re-derived after every step.
//! Execution is atomic: the first step failure aborts the run with a
//! `StepExecution` error carrying the step index, step kind, and cause,
//! and the caller persists nothing. Cancellation is cooperative, checked
//! between steps and between record batches within row-wise steps.

#![allow(clippy::result_large_err)]

use crate::errors::{Result, StrataError, StrataErrorKind};
use crate::model::pipeline::TransformStep;
use crate::model::schema::{refresh_schema, Schema};
use crate::model::value::Record;
use crate::transform::sandbox::{run_script, NoScripts, ScriptLimits, ScriptResolver};
use crate::transform::{aggregate, dedup, filter, join, map, sort, TransformError};
use std::collections::BTreeMap;
use strata_core_types::CancelToken;

/// Records per cancellation check in row-wise steps.
const BATCH_SIZE: usize = 256;

/// Resolves a data source reference (join right side) to its current
/// record set.
pub trait DatasetResolver {
    fn resolve_latest(&self, data_source_id: &str) -> Result<Vec<Record>>;
}

/// A resolver with no datasets; join steps fail against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDatasets;

impl DatasetResolver for NoDatasets {
    fn resolve_latest(&self, data_source_id: &str) -> Result<Vec<Record>> {
        Err(StrataError::new(StrataErrorKind::NotFound)
            .with_op("resolve_latest")
            .with_data_source_id(data_source_id)
            .with_message("no dataset resolver configured"))
    }
}

/// In-memory dataset resolver for library use and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDatasets {
    datasets: BTreeMap<String, Vec<Record>>,
}

impl StaticDatasets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, data_source_id: impl Into<String>, records: Vec<Record>) {
        self.datasets.insert(data_source_id.into(), records);
    }
}

impl DatasetResolver for StaticDatasets {
    fn resolve_latest(&self, data_source_id: &str) -> Result<Vec<Record>> {
        self.datasets.get(data_source_id).cloned().ok_or_else(|| {
            StrataError::new(StrataErrorKind::NotFound)
                .with_op("resolve_latest")
                .with_data_source_id(data_source_id)
                .with_message("data source not found")
        })
    }
}

/// Result of a successful (or warning) pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<Record>,
    pub schema: Schema,
    /// Sum of per-step input row counts
    pub rows_processed: u64,
    /// Non-fatal anomalies (e.g. type coercions); a non-empty list
    /// downgrades the run from Success to Warning
    pub warnings: Vec<String>,
}

/// Executes an ordered step list over an input dataset.
pub struct PipelineExecutor<'a> {
    datasets: &'a dyn DatasetResolver,
    scripts: &'a dyn ScriptResolver,
    limits: ScriptLimits,
    cancel: CancelToken,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(datasets: &'a dyn DatasetResolver, scripts: &'a dyn ScriptResolver) -> Self {
        Self {
            datasets,
            scripts,
            limits: ScriptLimits::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Override the script sandbox limits
    pub fn with_limits(mut self, limits: ScriptLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Attach an externally owned cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn check_cancelled(&self, op: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(StrataError::new(StrataErrorKind::Cancelled)
                .with_op(op.to_string())
                .with_message("cancelled by caller"));
        }
        Ok(())
    }

    /// Row-wise filter with a cancellation check per batch.
    fn run_filter(
        &self,
        records: Vec<Record>,
        config: &crate::model::pipeline::FilterConfig,
    ) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        for (i, record) in records.into_iter().enumerate() {
            if i % BATCH_SIZE == 0 {
                self.check_cancelled("execute")?;
            }
            if filter::matches_all(&record, config) {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Row-wise map with a cancellation check per batch.
    fn run_map(
        &self,
        records: Vec<Record>,
        config: &crate::model::pipeline::MapConfig,
    ) -> Result<(Vec<Record>, usize)> {
        let mut out = records;
        let mut coercions = 0;
        for (i, record) in out.iter_mut().enumerate() {
            if i % BATCH_SIZE == 0 {
                self.check_cancelled("execute")?;
            }
            coercions += map::map_record(record, config);
        }
        Ok((out, coercions))
    }

    /// Execute the step list over the input dataset.
    ///
    /// # Errors
    ///
    /// - `Cancelled` — the token was observed between steps or batches
    /// - `StepExecution` — a step failed; carries the step index, step
    ///   kind, and the typed cause as its source error
    pub fn execute(
        &self,
        steps: &[TransformStep],
        input: Vec<Record>,
        input_schema: Schema,
    ) -> Result<PipelineOutput> {
        let mut records = input;
        let mut schema = input_schema;
        let mut rows_processed: u64 = 0;
        let mut warnings: Vec<String> = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            self.check_cancelled("execute")
                .map_err(|e| e.with_step(index, step.kind()))?;
            rows_processed += records.len() as u64;

            records = self
                .run_step(index, step, records, &mut warnings)
                .map_err(|e| attach_step_context(e, index, step.kind()))?;

            schema = refresh_schema(&records, &schema);

            tracing::debug!(
                step_index = index,
                step_kind = step.kind(),
                record_count = records.len(),
                "Executed pipeline step"
            );
        }

        Ok(PipelineOutput {
            records,
            schema,
            rows_processed,
            warnings,
        })
    }

    fn run_step(
        &self,
        index: usize,
        step: &TransformStep,
        records: Vec<Record>,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<Record>> {
        match step {
            TransformStep::Filter(config) => self.run_filter(records, config),
            TransformStep::Map(config) => {
                let (out, coercions) = self.run_map(records, config)?;
                if coercions > 0 {
                    warnings.push(format!(
                        "step {}: {} value(s) coerced to null",
                        index, coercions
                    ));
                }
                Ok(out)
            }
            TransformStep::Sort(config) => Ok(sort::apply_sort(records, config)),
            TransformStep::Aggregate(config) => Ok(aggregate::apply_aggregate(&records, config)),
            TransformStep::Join(config) => {
                let right = self.datasets.resolve_latest(&config.data_source_id)?;
                join::apply_join(records, right, config).map_err(StrataError::from)
            }
            TransformStep::Deduplicate(config) => Ok(dedup::apply_dedup(records, config)),
            TransformStep::CustomScript(config) => {
                let transform = self.scripts.resolve(&config.script).ok_or_else(|| {
                    StrataError::from(TransformError::UnknownScript {
                        name: config.script.clone(),
                    })
                })?;
                run_script(
                    &config.script,
                    transform.as_ref(),
                    &records,
                    &self.limits,
                    &self.cancel,
                )
            }
        }
    }
}

impl Default for PipelineExecutor<'static> {
    /// Executor with no datasets and no scripts; pure step pipelines only
    fn default() -> Self {
        static NO_DATASETS: NoDatasets = NoDatasets;
        static NO_SCRIPTS: NoScripts = NoScripts;
        PipelineExecutor::new(&NO_DATASETS, &NO_SCRIPTS)
    }
}

/// Wrap a step failure as `StepExecution` with the failing step's index
/// and kind, keeping the typed cause as the source. Cancellation passes
/// through with step context but keeps its own kind.
fn attach_step_context(err: StrataError, index: usize, kind: &str) -> StrataError {
    if err.kind() == StrataErrorKind::Cancelled {
        return err.with_step(index, kind);
    }
    StrataError::new(StrataErrorKind::StepExecution)
        .with_op("execute")
        .with_step(index, kind)
        .with_message(err.message().to_string())
        .with_source(err)
}
