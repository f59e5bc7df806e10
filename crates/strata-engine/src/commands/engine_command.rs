//! Closed command union over the engine's boundary operations.
//!
//! Every external surface (CLI today, an HTTP layer tomorrow) funnels
//! through [`apply_engine_command`], so permission checks, logging, and
//! error rendering live in exactly one place.

#![allow(clippy::result_large_err)]

use crate::commands::{cleanup, compare, lineage, run, snapshot};
use strata_core::diff::model::{Comparison, DiffOptions};
use strata_core::errors::Result;
use strata_core::model::lineage::LineageEdge;
use strata_core::model::pipeline::Pipeline;
use strata_core::model::snapshot::Snapshot;
use strata_core::transform::sandbox::ScriptResolver;
use strata_core_types::CancelToken;
use strata_store::{CleanupReport, DeleteOutcome, NewSnapshot, SnapshotFilters, SnapshotStore};

/// One boundary operation.
pub enum EngineCommand {
    SnapshotCreate {
        request: NewSnapshot,
    },
    SnapshotList {
        data_source_id: String,
        filters: SnapshotFilters,
    },
    SnapshotDelete {
        snapshot_id: String,
    },
    SnapshotData {
        snapshot_id: String,
        limit: Option<usize>,
        offset: usize,
    },
    Compare {
        from_snapshot_id: String,
        to_snapshot_id: String,
        comparison_key: String,
        options: DiffOptions,
    },
    Cleanup {
        data_source_id: String,
        keep: usize,
    },
    PipelineRun {
        pipeline: Pipeline,
    },
    LineageTrack {
        source_node_id: String,
        target_node_id: String,
        transformation_type: String,
        record_count: i64,
    },
}

/// The matching result per command variant.
pub enum EngineCommandResult {
    SnapshotCreate(Snapshot),
    SnapshotList(Vec<Snapshot>),
    SnapshotDelete(DeleteOutcome),
    SnapshotData(snapshot::DataPage),
    Compare(Comparison),
    Cleanup(CleanupReport),
    PipelineRun(run::RunReport),
    LineageTrack(LineageEdge),
}

/// Dispatch one command against the store.
pub fn apply_engine_command(
    command: EngineCommand,
    store: &SnapshotStore,
    scripts: &dyn ScriptResolver,
    cancel: CancelToken,
) -> Result<EngineCommandResult> {
    match command {
        EngineCommand::SnapshotCreate { request } => snapshot::create_snapshot(store, request)
            .map(EngineCommandResult::SnapshotCreate),
        EngineCommand::SnapshotList {
            data_source_id,
            filters,
        } => snapshot::list_snapshots(store, &data_source_id, &filters)
            .map(EngineCommandResult::SnapshotList),
        EngineCommand::SnapshotDelete { snapshot_id } => {
            snapshot::delete_snapshot(store, &snapshot_id).map(EngineCommandResult::SnapshotDelete)
        }
        EngineCommand::SnapshotData {
            snapshot_id,
            limit,
            offset,
        } => snapshot::snapshot_data(store, &snapshot_id, limit, offset)
            .map(EngineCommandResult::SnapshotData),
        EngineCommand::Compare {
            from_snapshot_id,
            to_snapshot_id,
            comparison_key,
            options,
        } => compare::compare_snapshots(
            store,
            &from_snapshot_id,
            &to_snapshot_id,
            &comparison_key,
            &options,
        )
        .map(EngineCommandResult::Compare),
        EngineCommand::Cleanup {
            data_source_id,
            keep,
        } => cleanup::cleanup(store, &data_source_id, keep).map(EngineCommandResult::Cleanup),
        EngineCommand::PipelineRun { pipeline } => {
            run::run_pipeline(store, &pipeline, scripts, cancel)
                .map(EngineCommandResult::PipelineRun)
        }
        EngineCommand::LineageTrack {
            source_node_id,
            target_node_id,
            transformation_type,
            record_count,
        } => lineage::track_data_flow(
            store,
            &source_node_id,
            &target_node_id,
            &transformation_type,
            record_count,
        )
        .map(EngineCommandResult::LineageTrack),
    }
}
