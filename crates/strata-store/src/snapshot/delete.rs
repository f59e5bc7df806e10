//! Snapshot deletion.
//!
//! Deleting cascades to the record partition. A pinned snapshot is not
//! removed under a running reader: the row is retired (invisible to
//! reads) and purged when the last pin drops.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::snapshot::{fetch_status, SnapshotStore};
use rusqlite::Connection;
use strata_core::errors::{StrataError, StrataErrorKind};
use strata_core::model::snapshot::SnapshotStatus;

/// How a delete request was honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Rows removed immediately
    Deleted,
    /// Snapshot retired; rows removed when the last pin drops
    Deferred,
}

/// Remove a snapshot's rows (partition first, then the ledger row).
///
/// Never touches the data source pointer: version numbers are a
/// high-water mark and are not reused after deletes.
pub(crate) fn purge_rows(conn: &Connection, snapshot_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM snapshot_records WHERE snapshot_id = ?1",
        [snapshot_id],
    )
    .map_err(from_rusqlite)?;
    conn.execute("DELETE FROM snapshots WHERE snapshot_id = ?1", [snapshot_id])
        .map_err(from_rusqlite)?;
    Ok(())
}

impl SnapshotStore {
    /// Delete a snapshot, cascading to its records.
    ///
    /// # Errors
    ///
    /// `NotFound` — no committed snapshot with this id exists (a row
    /// already retired by an earlier delete counts as absent).
    pub fn delete_snapshot(&self, snapshot_id: &str) -> Result<DeleteOutcome> {
        let mut pins = self.lock_pins()?;
        let conn = self.lock_conn()?;

        match fetch_status(&conn, snapshot_id)?.as_deref() {
            Some("committed") => {}
            _ => {
                return Err(StrataError::new(StrataErrorKind::NotFound)
                    .with_op("delete_snapshot")
                    .with_snapshot_id(snapshot_id)
                    .with_message("snapshot not found"));
            }
        }

        if pins.is_pinned(snapshot_id) {
            conn.execute(
                "UPDATE snapshots SET status = ?1 WHERE snapshot_id = ?2",
                rusqlite::params![SnapshotStatus::Retired.as_str(), snapshot_id],
            )
            .map_err(from_rusqlite)?;
            pins.mark_retired(snapshot_id);
            tracing::debug!(snapshot_id, "Delete deferred: snapshot is pinned");
            return Ok(DeleteOutcome::Deferred);
        }

        purge_rows(&conn, snapshot_id)?;
        tracing::debug!(snapshot_id, "Deleted snapshot");
        Ok(DeleteOutcome::Deleted)
    }
}
