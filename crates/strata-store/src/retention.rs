//! Retention/cleanup engine: "keep last N" over a data source's history.
//!
//! The candidate set is captured once at cleanup start. Before each
//! delete, the engine re-validates against current state: the candidate
//! must still be committed and at least `keep` newer committed versions
//! must still exist. A snapshot created after capture has a higher
//! version than every candidate, so it can never be removed, and the
//! report never miscounts it as stale.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::snapshot::delete::purge_rows;
use crate::snapshot::SnapshotStore;
use serde::{Deserialize, Serialize};
use strata_core::errors::{StrataError, StrataErrorKind};
use strata_core::model::snapshot::SnapshotStatus;

/// Result of one cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub deleted_count: usize,
    pub kept_count: usize,
}

impl SnapshotStore {
    /// Keep the `keep` most recent committed snapshots of a data source
    /// and delete the rest. Pinned candidates are retired (deferred
    /// delete) and count as deleted.
    ///
    /// `deleted_count + kept_count` equals the number of committed
    /// snapshots at capture time.
    pub fn cleanup(&self, data_source_id: &str, keep: usize) -> Result<CleanupReport> {
        if data_source_id.is_empty() {
            return Err(StrataError::new(StrataErrorKind::Validation)
                .with_op("cleanup")
                .with_message("data_source_id must not be empty"));
        }

        // Capture the candidate set: everything past the first `keep`
        // in version-descending order.
        let captured: Vec<(String, i64)> = {
            let conn = self.lock_conn()?;
            let mut stmt = conn
                .prepare(
                    "SELECT snapshot_id, version FROM snapshots
                     WHERE data_source_id = ?1 AND status = 'committed'
                     ORDER BY version DESC",
                )
                .map_err(from_rusqlite)?;
            let rows: std::result::Result<Vec<(String, i64)>, _> = stmt
                .query_map([data_source_id], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(from_rusqlite)?
                .collect();
            rows.map_err(from_rusqlite)?
        };

        let total = captured.len();
        let mut deleted_count = 0usize;

        for (snapshot_id, version) in captured.iter().skip(keep) {
            let mut pins = self.lock_pins()?;
            let conn = self.lock_conn()?;

            // Re-validate immediately before the delete: the row may be
            // gone already, or concurrent deletes may have pulled this
            // candidate back into the keep window.
            let status: Option<String> = {
                use rusqlite::OptionalExtension as _;
                conn.query_row(
                    "SELECT status FROM snapshots WHERE snapshot_id = ?1",
                    [snapshot_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(from_rusqlite)?
            };
            if status.as_deref() != Some("committed") {
                continue;
            }

            let newer: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM snapshots
                     WHERE data_source_id = ?1 AND status = 'committed' AND version > ?2",
                    rusqlite::params![data_source_id, version],
                    |row| row.get(0),
                )
                .map_err(from_rusqlite)?;
            if (newer as usize) < keep {
                continue;
            }

            if pins.is_pinned(snapshot_id) {
                conn.execute(
                    "UPDATE snapshots SET status = ?1 WHERE snapshot_id = ?2",
                    rusqlite::params![SnapshotStatus::Retired.as_str(), snapshot_id],
                )
                .map_err(from_rusqlite)?;
                pins.mark_retired(snapshot_id);
            } else {
                purge_rows(&conn, snapshot_id)?;
            }
            deleted_count += 1;
        }

        let report = CleanupReport {
            deleted_count,
            kept_count: total - deleted_count,
        };
        tracing::debug!(
            data_source_id,
            keep,
            deleted_count = report.deleted_count,
            kept_count = report.kept_count,
            "Cleanup finished"
        );
        Ok(report)
    }
}
