//! CLI command modules.

pub mod cleanup;
pub mod compare;
pub mod lineage;
pub mod pipeline;
pub mod snapshot;

use std::path::Path;
use strata_core::transform::sandbox::ScriptRegistry;
use strata_core_types::CancelToken;
use strata_engine::{apply_engine_command, EngineCommand, EngineCommandResult};
use strata_store::SnapshotStore;

/// Open the store at `db_path`, creating parent directories as needed.
pub fn open_store(db_path: &str) -> Result<SnapshotStore, Box<dyn std::error::Error>> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(SnapshotStore::open(db_path)?)
}

/// Dispatch one engine command with the CLI's ambient context: no
/// registered scripts and no external cancellation.
pub fn dispatch(
    store: &SnapshotStore,
    command: EngineCommand,
) -> Result<EngineCommandResult, Box<dyn std::error::Error>> {
    let registry = ScriptRegistry::new();
    Ok(apply_engine_command(
        command,
        store,
        &registry,
        CancelToken::new(),
    )?)
}
