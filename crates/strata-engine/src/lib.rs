//! strata-engine — orchestration over the store and the core engines
//!
//! Exposes the boundary operations (snapshot create/list/delete,
//! compare, cleanup, pipeline run, lineage track) as a closed
//! [`commands::EngineCommand`] union dispatched through one entry
//! point, plus direct command functions for library callers.

pub mod commands;

pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use commands::run::{run_pipeline, RunReport, StoreDatasets};
