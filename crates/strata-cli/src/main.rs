//! strata CLI
//!
//! Command-line interface for the strata snapshot/transform engine

use clap::{Parser, Subcommand};
use strata_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "strata")]
#[command(about = "strata - snapshot versioning and transform pipelines", long_about = None)]
struct Cli {
    /// Emit JSON logs (production profile)
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Snapshot operations (create, list, show, data, delete)
    Snapshot(commands::snapshot::SnapshotArgs),
    /// Compare two snapshots by a key field
    Compare(commands::compare::CompareArgs),
    /// Keep-last-N retention cleanup
    Cleanup(commands::cleanup::CleanupArgs),
    /// Pipeline operations
    Pipeline(commands::pipeline::PipelineArgs),
    /// Lineage operations
    Lineage(commands::lineage::LineageArgs),
}

fn main() {
    let cli = Cli::parse();

    init(if cli.log_json {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match cli.command {
        Commands::Snapshot(args) => commands::snapshot::execute(args),
        Commands::Compare(args) => commands::compare::execute(args),
        Commands::Cleanup(args) => commands::cleanup::execute(args),
        Commands::Pipeline(args) => commands::pipeline::execute(args),
        Commands::Lineage(args) => commands::lineage::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
