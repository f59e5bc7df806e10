//! Snapshot pinning.
//!
//! A diff pins the two snapshot ids it reads for its whole duration.
//! A concurrent delete against a pinned snapshot is deferred: the row
//! is retired, and the last pin to drop purges it. The pin table is the
//! reference-count registry; [`SnapshotPin`] is the RAII guard.

#![allow(clippy::result_large_err)]

use crate::snapshot::delete::purge_rows;
use crate::snapshot::{fetch_status, SnapshotStore, StoreInner};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use strata_core::errors::{StrataError, StrataErrorKind};

/// Reference counts plus the set of snapshots awaiting purge.
#[derive(Default)]
pub(crate) struct PinTable {
    counts: HashMap<String, usize>,
    retired: HashSet<String>,
}

impl PinTable {
    pub(crate) fn is_pinned(&self, snapshot_id: &str) -> bool {
        self.counts.get(snapshot_id).copied().unwrap_or(0) > 0
    }

    pub(crate) fn increment(&mut self, snapshot_id: &str) {
        *self.counts.entry(snapshot_id.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn mark_retired(&mut self, snapshot_id: &str) {
        self.retired.insert(snapshot_id.to_string());
    }

    /// Drop one pin. Returns true when this was the last pin of a
    /// retired snapshot, i.e. the caller must purge its rows.
    pub(crate) fn release(&mut self, snapshot_id: &str) -> bool {
        let remaining = match self.counts.get_mut(snapshot_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return false,
        };
        if remaining > 0 {
            return false;
        }
        self.counts.remove(snapshot_id);
        self.retired.remove(snapshot_id)
    }
}

/// RAII guard keeping one snapshot readable.
pub struct SnapshotPin {
    inner: Arc<StoreInner>,
    snapshot_id: String,
}

impl std::fmt::Debug for SnapshotPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotPin")
            .field("snapshot_id", &self.snapshot_id)
            .finish()
    }
}

impl SnapshotPin {
    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }
}

impl Drop for SnapshotPin {
    fn drop(&mut self) {
        let purge = match self.inner.pins.lock() {
            Ok(mut pins) => pins.release(&self.snapshot_id),
            Err(_) => false,
        };
        if purge {
            match self.inner.conn.lock() {
                Ok(conn) => {
                    if let Err(e) = purge_rows(&conn, &self.snapshot_id) {
                        tracing::warn!(
                            snapshot_id = %self.snapshot_id,
                            error = %e,
                            "Failed to purge retired snapshot on unpin"
                        );
                    } else {
                        tracing::debug!(
                            snapshot_id = %self.snapshot_id,
                            "Purged retired snapshot after last pin dropped"
                        );
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        snapshot_id = %self.snapshot_id,
                        "Connection poisoned; retired snapshot not purged"
                    );
                }
            }
        }
    }
}

impl SnapshotStore {
    /// Pin a committed snapshot against deletion.
    ///
    /// # Errors
    ///
    /// `NotFound` — the snapshot does not exist or is already retired.
    pub fn pin(&self, snapshot_id: &str) -> Result<SnapshotPin, StrataError> {
        let mut pins = self.lock_pins()?;
        {
            let conn = self.lock_conn()?;
            match fetch_status(&conn, snapshot_id)?.as_deref() {
                Some("committed") => {}
                _ => {
                    return Err(StrataError::new(StrataErrorKind::NotFound)
                        .with_op("pin")
                        .with_snapshot_id(snapshot_id)
                        .with_message("snapshot not found"));
                }
            }
        }
        pins.increment(snapshot_id);
        Ok(SnapshotPin {
            inner: self.inner.clone(),
            snapshot_id: snapshot_id.to_string(),
        })
    }
}
