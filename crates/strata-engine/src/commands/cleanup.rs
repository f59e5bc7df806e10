//! Retention cleanup command.

#![allow(clippy::result_large_err)]

use std::time::Instant;
use strata_core::errors::Result;
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_store::{CleanupReport, SnapshotStore};

/// Enforce a keep-last-N policy (boundary: `POST /snapshots/cleanup`).
pub fn cleanup(store: &SnapshotStore, data_source_id: &str, keep: usize) -> Result<CleanupReport> {
    let start = Instant::now();
    log_op_start!("cleanup", data_source_id = data_source_id, keep = keep);

    match store.cleanup(data_source_id, keep) {
        Ok(report) => {
            log_op_end!(
                "cleanup",
                duration_ms = start.elapsed().as_millis() as u64,
                deleted_count = report.deleted_count,
                kept_count = report.kept_count
            );
            Ok(report)
        }
        Err(e) => {
            log_op_error!("cleanup", e, duration_ms = start.elapsed().as_millis() as u64);
            Err(e)
        }
    }
}
