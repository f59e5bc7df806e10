//! Cleanup subcommand

use clap::Args;
use strata_engine::{EngineCommand, EngineCommandResult};

use crate::commands::{dispatch, open_store};

#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Data source whose history to trim
    #[arg(long)]
    pub data_source: String,

    /// Number of most recent snapshots to keep
    #[arg(long)]
    pub keep: usize,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

pub fn execute(args: CleanupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let EngineCommandResult::Cleanup(report) = dispatch(
        &store,
        EngineCommand::Cleanup {
            data_source_id: args.data_source.clone(),
            keep: args.keep,
        },
    )?
    else {
        unreachable!()
    };
    println!(
        "Cleanup finished: deleted={} kept={}",
        report.deleted_count, report.kept_count
    );
    Ok(())
}
