//! Compare subcommand

use clap::Args;
use strata_core::diff::model::{DiffOptions, DuplicateKeyPolicy};
use strata_engine::{EngineCommand, EngineCommandResult};

use crate::commands::{dispatch, open_store};

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Snapshot on the "from" side
    pub from: String,

    /// Snapshot on the "to" side
    pub to: String,

    /// Comparison key field
    #[arg(long)]
    pub key: String,

    /// Include the unchanged record list in the output
    #[arg(long)]
    pub include_unchanged: bool,

    /// Trim surrounding whitespace from text keys before matching
    #[arg(long)]
    pub trim_strings: bool,

    /// Match text keys case-insensitively
    #[arg(long)]
    pub ignore_case: bool,

    /// Keep the first occurrence of a duplicate key instead of failing
    #[arg(long)]
    pub first_wins: bool,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

pub fn execute(args: CompareArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let options = DiffOptions {
        include_unchanged: args.include_unchanged,
        trim_strings: args.trim_strings,
        case_sensitive: !args.ignore_case,
        duplicate_keys: if args.first_wins {
            DuplicateKeyPolicy::FirstWins
        } else {
            DuplicateKeyPolicy::Fail
        },
    };

    let EngineCommandResult::Compare(comparison) = dispatch(
        &store,
        EngineCommand::Compare {
            from_snapshot_id: args.from.clone(),
            to_snapshot_id: args.to.clone(),
            comparison_key: args.key.clone(),
            options,
        },
    )?
    else {
        unreachable!()
    };

    println!(
        "added={} removed={} modified={} unchanged={} ({} ms)",
        comparison.counts.added,
        comparison.counts.removed,
        comparison.counts.modified,
        comparison.counts.unchanged,
        comparison.duration_ms
    );
    if !comparison.diagnostics.is_empty() {
        println!(
            "duplicate keys: left={:?} right={:?}",
            comparison.diagnostics.duplicate_keys_left,
            comparison.diagnostics.duplicate_keys_right
        );
    }
    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(())
}
