//! Snapshot subcommands

use clap::{Args, Subcommand};
use strata_engine::commands::snapshot as engine_snapshot;
use strata_engine::{EngineCommand, EngineCommandResult};
use strata_store::{NewSnapshot, SnapshotFilters};

use crate::commands::{dispatch, open_store};

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub command: SnapshotCommand,
}

#[derive(Debug, Subcommand)]
pub enum SnapshotCommand {
    /// Create a snapshot from a JSON file of records
    Create(CreateArgs),
    /// List a data source's snapshots
    List(ListArgs),
    /// Show one snapshot's metadata
    Show(ShowArgs),
    /// Page through one snapshot's records
    Data(DataArgs),
    /// Delete a snapshot (cascades to its records)
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Data source identifier
    #[arg(long)]
    pub data_source: String,

    /// Path to a JSON array of record objects
    #[arg(long)]
    pub records: String,

    /// Optional file type hint recorded in metadata
    #[arg(long)]
    pub file_type: Option<String>,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub data_source: String,

    #[arg(long)]
    pub min_version: Option<i64>,

    #[arg(long)]
    pub max_version: Option<i64>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Snapshot identifier
    pub id: String,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

#[derive(Debug, Args)]
pub struct DataArgs {
    /// Snapshot identifier
    pub id: String,

    #[arg(long, default_value = "50")]
    pub limit: usize,

    #[arg(long, default_value = "0")]
    pub offset: usize,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Snapshot identifier
    pub id: String,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

pub fn execute(args: SnapshotArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SnapshotCommand::Create(args) => execute_create(args),
        SnapshotCommand::List(args) => execute_list(args),
        SnapshotCommand::Show(args) => execute_show(args),
        SnapshotCommand::Data(args) => execute_data(args),
        SnapshotCommand::Delete(args) => execute_delete(args),
    }
}

fn execute_create(args: CreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let raw = std::fs::read_to_string(&args.records)?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    let records = strata_core::model::value::records_from_json(json)?;

    let mut request = NewSnapshot::new(args.data_source, records);
    if let Some(file_type) = args.file_type {
        request = request.with_file_type(file_type);
    }

    let EngineCommandResult::SnapshotCreate(snapshot) =
        dispatch(&store, EngineCommand::SnapshotCreate { request })?
    else {
        unreachable!()
    };

    println!("Snapshot created:");
    println!("  snapshot_id: {}", snapshot.snapshot_id);
    println!("  version: {}", snapshot.version);
    println!("  record_count: {}", snapshot.record_count);
    println!("  checksum: {}", snapshot.metadata.checksum);
    Ok(())
}

fn execute_list(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let EngineCommandResult::SnapshotList(snapshots) = dispatch(
        &store,
        EngineCommand::SnapshotList {
            data_source_id: args.data_source.clone(),
            filters: SnapshotFilters {
                min_version: args.min_version,
                max_version: args.max_version,
                limit: args.limit,
            },
        },
    )?
    else {
        unreachable!()
    };

    if snapshots.is_empty() {
        println!("No snapshots for {}", args.data_source);
        return Ok(());
    }
    for snapshot in snapshots {
        println!(
            "v{}  {}  {} record(s)  {}",
            snapshot.version,
            snapshot.snapshot_id,
            snapshot.record_count,
            snapshot.created_at.to_rfc3339()
        );
    }
    Ok(())
}

fn execute_show(args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let snapshot = engine_snapshot::get_snapshot(&store, &args.id)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn execute_data(args: DataArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let EngineCommandResult::SnapshotData(page) = dispatch(
        &store,
        EngineCommand::SnapshotData {
            snapshot_id: args.id,
            limit: Some(args.limit),
            offset: args.offset,
        },
    )?
    else {
        unreachable!()
    };

    println!(
        "Snapshot {} (v{}), records {}..{} of {}:",
        page.snapshot_id,
        page.version,
        page.offset,
        page.offset + page.records.len(),
        page.total_records
    );
    println!("{}", serde_json::to_string_pretty(&page.records)?);
    Ok(())
}

fn execute_delete(args: DeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let EngineCommandResult::SnapshotDelete(outcome) = dispatch(
        &store,
        EngineCommand::SnapshotDelete {
            snapshot_id: args.id.clone(),
        },
    )?
    else {
        unreachable!()
    };

    match outcome {
        strata_store::DeleteOutcome::Deleted => println!("Deleted {}", args.id),
        strata_store::DeleteOutcome::Deferred => {
            println!("Deferred: {} is pinned and will be purged on release", args.id)
        }
    }
    Ok(())
}
