//! Snapshot boundary operations with the canonical logging envelope.

#![allow(clippy::result_large_err)]

use std::time::Instant;
use strata_core::errors::Result;
use strata_core::model::snapshot::Snapshot;
use strata_core::model::value::Record;
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_store::{DeleteOutcome, NewSnapshot, SnapshotFilters, SnapshotStore};

/// One page of a snapshot's record partition.
#[derive(Debug, Clone)]
pub struct DataPage {
    pub snapshot_id: String,
    pub version: i64,
    pub records: Vec<Record>,
    pub offset: usize,
    pub total_records: i64,
}

/// Create a snapshot (boundary: `POST /snapshots`).
pub fn create_snapshot(store: &SnapshotStore, request: NewSnapshot) -> Result<Snapshot> {
    let start = Instant::now();
    log_op_start!("create_snapshot", data_source_id = request.data_source_id.as_str());

    match store.create_snapshot(request) {
        Ok(snapshot) => {
            log_op_end!(
                "create_snapshot",
                duration_ms = start.elapsed().as_millis() as u64,
                snapshot_id = snapshot.snapshot_id.as_str(),
                version = snapshot.version
            );
            Ok(snapshot)
        }
        Err(e) => {
            log_op_error!(
                "create_snapshot",
                e,
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(e)
        }
    }
}

/// List snapshots of a data source (boundary: `GET /snapshots`).
pub fn list_snapshots(
    store: &SnapshotStore,
    data_source_id: &str,
    filters: &SnapshotFilters,
) -> Result<Vec<Snapshot>> {
    store.list_by_data_source(data_source_id, filters)
}

/// Fetch one snapshot by id.
pub fn get_snapshot(store: &SnapshotStore, snapshot_id: &str) -> Result<Snapshot> {
    store.get_by_id(snapshot_id)
}

/// Delete a snapshot (boundary: `DELETE /snapshots/:id`).
pub fn delete_snapshot(store: &SnapshotStore, snapshot_id: &str) -> Result<DeleteOutcome> {
    let start = Instant::now();
    log_op_start!("delete_snapshot", snapshot_id = snapshot_id);

    match store.delete_snapshot(snapshot_id) {
        Ok(outcome) => {
            log_op_end!(
                "delete_snapshot",
                duration_ms = start.elapsed().as_millis() as u64
            );
            Ok(outcome)
        }
        Err(e) => {
            log_op_error!(
                "delete_snapshot",
                e,
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(e)
        }
    }
}

/// Paginated record view bound to one snapshot
/// (boundary: `GET /data-sources/:id/data?versionId=&limit=&offset=`).
pub fn snapshot_data(
    store: &SnapshotStore,
    snapshot_id: &str,
    limit: Option<usize>,
    offset: usize,
) -> Result<DataPage> {
    let snapshot = store.get_by_id(snapshot_id)?;
    let records = store.read_records(snapshot_id, limit, offset)?;
    Ok(DataPage {
        snapshot_id: snapshot.snapshot_id,
        version: snapshot.version,
        records,
        offset,
        total_records: snapshot.record_count,
    })
}
