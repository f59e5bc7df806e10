//! Pipeline subcommands
//!
//! Pipelines are defined as JSON files matching the `Pipeline` model.
//! Custom-script steps resolve against the embedding application's
//! registry; the CLI runs with an empty registry, so script steps fail
//! with an unknown-script step error here.

use clap::{Args, Subcommand};
use strata_core::model::pipeline::Pipeline;
use strata_engine::{EngineCommand, EngineCommandResult};

use crate::commands::{dispatch, open_store};

#[derive(Debug, Args)]
pub struct PipelineArgs {
    #[command(subcommand)]
    pub command: PipelineCommand,
}

#[derive(Debug, Subcommand)]
pub enum PipelineCommand {
    /// Run a pipeline definition against the store
    Run(RunArgs),
    /// List a pipeline's executions
    Executions(ExecutionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to a pipeline definition (JSON)
    #[arg(long)]
    pub pipeline: String,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

#[derive(Debug, Args)]
pub struct ExecutionsArgs {
    /// Pipeline identifier
    #[arg(long)]
    pub pipeline_id: String,

    #[arg(long, default_value = ".strata/store.db")]
    pub db: String,
}

pub fn execute(args: PipelineArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        PipelineCommand::Run(args) => execute_run(args),
        PipelineCommand::Executions(args) => execute_executions(args),
    }
}

fn execute_run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let raw = std::fs::read_to_string(&args.pipeline)?;
    let pipeline: Pipeline = serde_json::from_str(&raw)?;

    let EngineCommandResult::PipelineRun(report) =
        dispatch(&store, EngineCommand::PipelineRun { pipeline })?
    else {
        unreachable!()
    };

    println!("Pipeline run finished:");
    println!("  execution_id: {}", report.execution.execution_id);
    println!("  status: {}", report.execution.status.as_str());
    println!("  rows_processed: {}", report.execution.rows_processed);
    println!(
        "  output: {} v{} ({} record(s))",
        report.output_snapshot.data_source_id,
        report.output_snapshot.version,
        report.output_snapshot.record_count
    );
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
    Ok(())
}

fn execute_executions(args: ExecutionsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.db)?;
    let executions = store.list_executions(&args.pipeline_id)?;
    if executions.is_empty() {
        println!("No executions for {}", args.pipeline_id);
        return Ok(());
    }
    for execution in executions {
        let failed = match (execution.failed_step, &execution.failed_step_kind) {
            (Some(index), Some(kind)) => format!("  failed at step {} [{}]", index, kind),
            _ => String::new(),
        };
        println!(
            "{}  {}  {} row(s){}",
            execution.execution_id,
            execution.status.as_str(),
            execution.rows_processed,
            failed
        );
    }
    Ok(())
}
