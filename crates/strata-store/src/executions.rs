//! Execution ledger persistence.
//!
//! One row per pipeline run. The engine writes the row when a run
//! enters Running and rewrites it on the terminal transition, so an
//! interrupted process leaves an honest Running row behind.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::snapshot::{datetime_from_millis, SnapshotStore};
use rusqlite::OptionalExtension;
use strata_core::errors::{StrataError, StrataErrorKind};
use strata_core::model::execution::{Execution, ExecutionStatus};

struct RawExecutionRow {
    execution_id: String,
    pipeline_id: String,
    status: String,
    started_at: i64,
    finished_at: Option<i64>,
    rows_processed: i64,
    failed_step: Option<i64>,
    failed_step_kind: Option<String>,
    error_message: Option<String>,
    output_snapshot_id: Option<String>,
}

const EXECUTION_COLUMNS: &str = "execution_id, pipeline_id, status, started_at, finished_at, \
     rows_processed, failed_step, failed_step_kind, error_message, output_snapshot_id";

fn raw_execution_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawExecutionRow> {
    Ok(RawExecutionRow {
        execution_id: row.get(0)?,
        pipeline_id: row.get(1)?,
        status: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        rows_processed: row.get(5)?,
        failed_step: row.get(6)?,
        failed_step_kind: row.get(7)?,
        error_message: row.get(8)?,
        output_snapshot_id: row.get(9)?,
    })
}

fn execution_from_raw(raw: RawExecutionRow) -> Result<Execution> {
    let status = ExecutionStatus::parse(&raw.status).ok_or_else(|| {
        StrataError::new(StrataErrorKind::Internal)
            .with_op("execution_from_raw")
            .with_message(format!("unknown execution status '{}'", raw.status))
    })?;
    Ok(Execution {
        started_at: datetime_from_millis(raw.started_at)?,
        finished_at: raw.finished_at.map(datetime_from_millis).transpose()?,
        execution_id: raw.execution_id,
        pipeline_id: raw.pipeline_id,
        status,
        rows_processed: raw.rows_processed,
        failed_step: raw.failed_step,
        failed_step_kind: raw.failed_step_kind,
        error_message: raw.error_message,
        output_snapshot_id: raw.output_snapshot_id,
    })
}

impl SnapshotStore {
    /// Write (or rewrite) one execution ledger row.
    pub fn record_execution(&self, execution: &Execution) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO executions (
                execution_id, pipeline_id, status, started_at, finished_at,
                rows_processed, failed_step, failed_step_kind,
                error_message, output_snapshot_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                execution.execution_id,
                execution.pipeline_id,
                execution.status.as_str(),
                execution.started_at.timestamp_millis(),
                execution.finished_at.map(|t| t.timestamp_millis()),
                execution.rows_processed,
                execution.failed_step,
                execution.failed_step_kind,
                execution.error_message,
                execution.output_snapshot_id,
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Fetch one execution by id.
    ///
    /// # Errors
    ///
    /// `NotFound` — no such execution.
    pub fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        let conn = self.lock_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM executions WHERE execution_id = ?1",
                    EXECUTION_COLUMNS
                ),
                [execution_id],
                raw_execution_from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        match raw {
            Some(raw) => execution_from_raw(raw),
            None => Err(StrataError::new(StrataErrorKind::NotFound)
                .with_op("get_execution")
                .with_message(format!("execution '{}' not found", execution_id))),
        }
    }

    /// List a pipeline's executions, newest first.
    pub fn list_executions(&self, pipeline_id: &str) -> Result<Vec<Execution>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM executions
                 WHERE pipeline_id = ?1
                 ORDER BY started_at DESC, execution_id DESC",
                EXECUTION_COLUMNS
            ))
            .map_err(from_rusqlite)?;
        let rows: std::result::Result<Vec<_>, _> = stmt
            .query_map([pipeline_id], raw_execution_from_row)
            .map_err(from_rusqlite)?
            .collect();
        rows.map_err(from_rusqlite)?
            .into_iter()
            .map(execution_from_raw)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_fetch_round_trip() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let mut execution = Execution::begin("pipe:1");
        store.record_execution(&execution).unwrap();

        let fetched = store.get_execution(&execution.execution_id).unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Running);

        execution.status = ExecutionStatus::Success;
        execution.finished_at = Some(chrono::Utc::now());
        execution.rows_processed = 42;
        store.record_execution(&execution).unwrap();

        let fetched = store.get_execution(&execution.execution_id).unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Success);
        assert_eq!(fetched.rows_processed, 42);
        assert!(fetched.finished_at.is_some());
    }

    #[test]
    fn test_missing_execution_is_not_found() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let err = store.get_execution("exec:nope").unwrap_err();
        assert_eq!(err.kind(), StrataErrorKind::NotFound);
    }

    #[test]
    fn test_list_is_scoped_to_pipeline() {
        let store = SnapshotStore::open_in_memory().unwrap();
        store.record_execution(&Execution::begin("pipe:a")).unwrap();
        store.record_execution(&Execution::begin("pipe:a")).unwrap();
        store.record_execution(&Execution::begin("pipe:b")).unwrap();
        assert_eq!(store.list_executions("pipe:a").unwrap().len(), 2);
        assert_eq!(store.list_executions("pipe:b").unwrap().len(), 1);
    }
}
