//! Snapshot comparison command.
//!
//! Pins both snapshots for the whole comparison, so a concurrent delete
//! or cleanup defers instead of yanking rows out from under the diff.
//! A snapshot already gone when the comparison starts fails cleanly
//! with NotFound — never a partially-read result.

#![allow(clippy::result_large_err)]

use std::time::Instant;
use strata_core::diff::engine::compute_comparison;
use strata_core::diff::model::{Comparison, DiffOptions};
use strata_core::errors::Result;
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_store::SnapshotStore;

/// Compare two snapshots by a key field
/// (boundary: `POST /snapshots/compare`).
pub fn compare_snapshots(
    store: &SnapshotStore,
    from_snapshot_id: &str,
    to_snapshot_id: &str,
    comparison_key: &str,
    options: &DiffOptions,
) -> Result<Comparison> {
    let start = Instant::now();
    log_op_start!(
        "compare_snapshots",
        from = from_snapshot_id,
        to = to_snapshot_id
    );

    let result = (|| {
        // Pins are held until this closure returns
        let _from_pin = store.pin(from_snapshot_id)?;
        let _to_pin = store.pin(to_snapshot_id)?;

        let left = store.read_all_records(from_snapshot_id)?;
        let right = store.read_all_records(to_snapshot_id)?;
        compute_comparison(&left, &right, comparison_key, options)
    })();

    match result {
        Ok(comparison) => {
            log_op_end!(
                "compare_snapshots",
                duration_ms = start.elapsed().as_millis() as u64,
                added = comparison.counts.added,
                removed = comparison.counts.removed,
                modified = comparison.counts.modified
            );
            Ok(comparison)
        }
        Err(e) => {
            log_op_error!(
                "compare_snapshots",
                e,
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(e)
        }
    }
}
