//! Lineage subcommands

use clap::{Args, Subcommand};
use strata_engine::commands::lineage;
use strata_engine::{EngineCommand, EngineCommandResult};

use crate::commands::{dispatch, open_store};

#[derive(Debug, Args)]
pub struct LineageArgs {
    #[command(subcommand)]
    pub command: LineageCommand,
}

#[derive(Debug, Subcommand)]
pub enum LineageCommand {
    /// Record a data-flow edge
    Track(TrackArgs),
    /// List edges, optionally scoped to one node
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct TrackArgs {
    #[arg(long)]
    pub source: String,

    #[arg(long)]
    pub target: String,

    #[arg(long, default_value = "pipeline")]
    pub transformation_type: String,

    #[arg(long, default_value = "0")]
    pub record_count: i64,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only edges touching this node
    #[arg(long)]
    pub node: Option<String>,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

pub fn execute(args: LineageArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        LineageCommand::Track(args) => execute_track(args),
        LineageCommand::List(args) => execute_list(args),
    }
}

fn execute_track(args: TrackArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let EngineCommandResult::LineageTrack(edge) = dispatch(
        &store,
        EngineCommand::LineageTrack {
            source_node_id: args.source.clone(),
            target_node_id: args.target.clone(),
            transformation_type: args.transformation_type.clone(),
            record_count: args.record_count,
        },
    )?
    else {
        unreachable!()
    };
    println!("Edge recorded:");
    println!("  edge_id: {}", edge.edge_id);
    println!("  {} -> {}", edge.source_node_id, edge.target_node_id);
    Ok(())
}

fn execute_list(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let edges = lineage::list_edges(&store, args.node.as_deref())?;
    if edges.is_empty() {
        println!("No lineage edges");
        return Ok(());
    }
    for edge in edges {
        println!(
            "{} -> {}  [{}]  {} record(s)",
            edge.source_node_id, edge.target_node_id, edge.transformation_type, edge.record_count
        );
    }
    Ok(())
}
