//! Pipeline run ledger entries and the execution status machine.
//!
//! `Idle -> Running -> {Success, Error, Warning}`; any terminal state can
//! re-enter `Running` on a new trigger. No partial state is ever visible
//! outside a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of one pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Idle,
    Running,
    Success,
    /// Completed with non-fatal anomalies (e.g. type coercions)
    Warning,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Idle => "idle",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Warning => "warning",
            ExecutionStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<ExecutionStatus> {
        match s {
            "idle" => Some(ExecutionStatus::Idle),
            "running" => Some(ExecutionStatus::Running),
            "success" => Some(ExecutionStatus::Success),
            "warning" => Some(ExecutionStatus::Warning),
            "error" => Some(ExecutionStatus::Error),
            _ => None,
        }
    }

    /// True for Success, Warning, and Error
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Warning | ExecutionStatus::Error
        )
    }

    /// Legal transitions of the status machine
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        match (self, next) {
            (ExecutionStatus::Idle, ExecutionStatus::Running) => true,
            (ExecutionStatus::Running, s) if s.is_terminal() => true,
            (s, ExecutionStatus::Running) if s.is_terminal() => true,
            _ => false,
        }
    }
}

/// One run of a pipeline, as recorded in the execution ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Unique execution identifier (UUIDv7)
    pub execution_id: String,
    pub pipeline_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Sum of per-step input row counts
    pub rows_processed: i64,
    /// Index of the failing step, when status is Error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Snapshot persisted on success/warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_snapshot_id: Option<String>,
}

impl Execution {
    /// Start a new Running execution for the given pipeline
    pub fn begin(pipeline_id: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::now_v7().to_string(),
            pipeline_id: pipeline_id.into(),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            rows_processed: 0,
            failed_step: None,
            failed_step_kind: None,
            error_message: None,
            output_snapshot_id: None,
        }
    }
}
