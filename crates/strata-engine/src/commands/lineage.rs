//! Lineage tracking command.

#![allow(clippy::result_large_err)]

use std::time::Instant;
use strata_core::errors::Result;
use strata_core::model::lineage::LineageEdge;
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_store::SnapshotStore;

/// Record a data-flow edge (boundary: `POST /lineage/track`).
pub fn track_data_flow(
    store: &SnapshotStore,
    source_node_id: &str,
    target_node_id: &str,
    transformation_type: &str,
    record_count: i64,
) -> Result<LineageEdge> {
    let start = Instant::now();
    log_op_start!(
        "track_data_flow",
        source = source_node_id,
        target = target_node_id
    );

    match store.track_data_flow(
        source_node_id,
        target_node_id,
        transformation_type,
        record_count,
    ) {
        Ok(edge) => {
            log_op_end!(
                "track_data_flow",
                duration_ms = start.elapsed().as_millis() as u64
            );
            Ok(edge)
        }
        Err(e) => {
            log_op_error!(
                "track_data_flow",
                e,
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(e)
        }
    }
}

/// List edges touching one node, or all edges.
pub fn list_edges(store: &SnapshotStore, node_id: Option<&str>) -> Result<Vec<LineageEdge>> {
    store.list_lineage_edges(node_id)
}
