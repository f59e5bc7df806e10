//! Pipeline run orchestration.
//!
//! ## Run pipeline (in order):
//! 1. Resolve the input snapshot (latest of the input data source)
//! 2. Open an execution ledger row in Running
//! 3. Execute the step list (atomic; cancellation cooperative)
//! 4. On failure: ledger → Error with the failing step, no snapshot
//! 5. On success: persist the output snapshot, ledger → Success (or
//!    Warning when coercions occurred), record lineage edges
//!
//! Lineage nodes are snapshot- and run-scoped (input snapshot id →
//! execution id → output snapshot id), so run edges can never close a
//! cycle even when a pipeline writes back to its own input source.

#![allow(clippy::result_large_err)]

use std::time::Instant;
use strata_core::errors::{Result, StrataError, StrataErrorKind};
use strata_core::model::execution::{Execution, ExecutionStatus};
use strata_core::model::pipeline::{Pipeline, TransformStep};
use strata_core::model::snapshot::Snapshot;
use strata_core::model::value::Record;
use strata_core::transform::sandbox::ScriptResolver;
use strata_core::transform::{DatasetResolver, PipelineExecutor};
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_core_types::CancelToken;
use strata_store::{NewSnapshot, SnapshotStore};

/// Dataset resolver backed by the snapshot store: a data source
/// reference resolves to its latest committed snapshot's records.
pub struct StoreDatasets<'a> {
    store: &'a SnapshotStore,
}

impl<'a> StoreDatasets<'a> {
    pub fn new(store: &'a SnapshotStore) -> Self {
        Self { store }
    }
}

impl DatasetResolver for StoreDatasets<'_> {
    fn resolve_latest(&self, data_source_id: &str) -> Result<Vec<Record>> {
        let snapshot = self.store.get_latest(data_source_id)?.ok_or_else(|| {
            StrataError::new(StrataErrorKind::NotFound)
                .with_op("resolve_latest")
                .with_data_source_id(data_source_id)
                .with_message("data source has no snapshots")
        })?;
        self.store.read_all_records(&snapshot.snapshot_id)
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub execution: Execution,
    pub output_snapshot: Snapshot,
    pub warnings: Vec<String>,
}

/// Run a pipeline end to end.
///
/// Reads the latest snapshot of the input data source, executes the
/// steps, and persists the result as a new version of the output data
/// source. Atomic: a step failure records an Error execution and leaves
/// the output source's latest version unchanged.
///
/// # Errors
///
/// - `NotFound` — the input data source has no snapshots
/// - `StepExecution` — a step failed (index/kind/cause recorded in the
///   execution ledger as well)
/// - `Cancelled` — the token was observed between steps or batches
pub fn run_pipeline(
    store: &SnapshotStore,
    pipeline: &Pipeline,
    scripts: &dyn ScriptResolver,
    cancel: CancelToken,
) -> Result<RunReport> {
    let start = Instant::now();
    log_op_start!(
        "run_pipeline",
        pipeline_id = pipeline.id.as_str(),
        step_count = pipeline.steps.len()
    );

    let outcome = run_pipeline_inner(store, pipeline, scripts, cancel);
    match &outcome {
        Ok(report) => {
            log_op_end!(
                "run_pipeline",
                duration_ms = start.elapsed().as_millis() as u64,
                execution_id = report.execution.execution_id.as_str(),
                snapshot_id = report.output_snapshot.snapshot_id.as_str()
            );
        }
        Err(e) => {
            log_op_error!(
                "run_pipeline",
                e,
                duration_ms = start.elapsed().as_millis() as u64
            );
        }
    }
    outcome
}

fn run_pipeline_inner(
    store: &SnapshotStore,
    pipeline: &Pipeline,
    scripts: &dyn ScriptResolver,
    cancel: CancelToken,
) -> Result<RunReport> {
    // Step 1: resolve the input snapshot
    let input_snapshot = store
        .get_latest(&pipeline.input_data_source_id)?
        .ok_or_else(|| {
            StrataError::new(StrataErrorKind::NotFound)
                .with_op("run_pipeline")
                .with_data_source_id(pipeline.input_data_source_id.clone())
                .with_message("input data source has no snapshots")
        })?;
    let input_records = store.read_all_records(&input_snapshot.snapshot_id)?;
    let input_count = input_records.len() as i64;

    // Step 2: open the ledger row
    let mut execution = Execution::begin(pipeline.id.clone());
    store.record_execution(&execution)?;

    // Step 3: execute the steps
    let datasets = StoreDatasets::new(store);
    let executor = PipelineExecutor::new(&datasets, scripts).with_cancel_token(cancel);
    let output = match executor.execute(
        &pipeline.steps,
        input_records,
        input_snapshot.schema.clone(),
    ) {
        Ok(output) => output,
        Err(e) => {
            // Step 4: terminal Error; no snapshot was persisted
            execution.status = ExecutionStatus::Error;
            execution.finished_at = Some(chrono::Utc::now());
            execution.failed_step = e.step_index().map(|i| i as i64);
            execution.failed_step_kind = e.step_kind().map(str::to_string);
            execution.error_message = Some(e.to_string());
            store.record_execution(&execution)?;
            return Err(e);
        }
    };

    // Step 5: persist the output snapshot with the schema the executor
    // re-derived after the final step
    let output_snapshot = store.create_snapshot(
        NewSnapshot::new(pipeline.output_data_source_id.clone(), output.records)
            .with_schema(output.schema)
            .with_extra_metadata("pipeline_id", serde_json::json!(pipeline.id))
            .with_extra_metadata("execution_id", serde_json::json!(execution.execution_id)),
    )?;

    execution.status = if output.warnings.is_empty() {
        ExecutionStatus::Success
    } else {
        ExecutionStatus::Warning
    };
    execution.finished_at = Some(chrono::Utc::now());
    execution.rows_processed = output.rows_processed as i64;
    execution.output_snapshot_id = Some(output_snapshot.snapshot_id.clone());
    store.record_execution(&execution)?;

    record_run_lineage(store, pipeline, &execution, &input_snapshot, &output_snapshot, input_count);

    Ok(RunReport {
        execution,
        output_snapshot,
        warnings: output.warnings,
    })
}

/// Record the run's data-flow edges. Non-fatal: the run already
/// committed; a tracking failure is logged, not surfaced.
fn record_run_lineage(
    store: &SnapshotStore,
    pipeline: &Pipeline,
    execution: &Execution,
    input_snapshot: &Snapshot,
    output_snapshot: &Snapshot,
    input_count: i64,
) {
    let run_node = execution.execution_id.as_str();

    let mut flows: Vec<(String, String, &'static str, i64)> = vec![
        (
            input_snapshot.snapshot_id.clone(),
            run_node.to_string(),
            "pipeline",
            input_count,
        ),
        (
            run_node.to_string(),
            output_snapshot.snapshot_id.clone(),
            "pipeline",
            output_snapshot.record_count,
        ),
    ];

    // One edge per join source, from that source's latest snapshot
    for step in &pipeline.steps {
        if let TransformStep::Join(config) = step {
            match store.get_latest(&config.data_source_id) {
                Ok(Some(snapshot)) => flows.push((
                    snapshot.snapshot_id,
                    run_node.to_string(),
                    "join",
                    snapshot.record_count,
                )),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        data_source_id = %config.data_source_id,
                        error = %e,
                        "Could not resolve join source for lineage"
                    );
                }
            }
        }
    }

    for (source, target, transformation_type, record_count) in flows {
        if let Err(e) = store.track_data_flow(&source, &target, transformation_type, record_count)
        {
            tracing::warn!(
                source = %source,
                target = %target,
                error = %e,
                "Failed to record lineage edge for run"
            );
        }
    }
}
