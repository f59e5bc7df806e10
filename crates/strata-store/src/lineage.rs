//! Lineage edge persistence.
//!
//! The DAG invariant is enforced on insert: the persisted adjacency is
//! loaded and the core graph runs its reachability check before the new
//! edge row is written. The connection lock is held across load + check
//! + insert, so concurrent trackers cannot slip a cycle in between.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::snapshot::{datetime_from_millis, SnapshotStore};
use rusqlite::Connection;
use strata_core::lineage::LineageGraph;
use strata_core::model::lineage::LineageEdge;

fn load_graph(conn: &Connection) -> Result<LineageGraph> {
    let mut graph = LineageGraph::new();
    let mut stmt = conn
        .prepare("SELECT source_node_id, target_node_id FROM lineage_edges")
        .map_err(from_rusqlite)?;
    let rows: std::result::Result<Vec<(String, String)>, _> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(from_rusqlite)?
        .collect();
    for (source, target) in rows.map_err(from_rusqlite)? {
        graph.insert_unchecked(&source, &target);
    }
    Ok(graph)
}

struct RawEdgeRow {
    edge_id: String,
    source_node_id: String,
    target_node_id: String,
    transformation_type: String,
    record_count: i64,
    created_at_ms: i64,
}

fn edge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEdgeRow> {
    Ok(RawEdgeRow {
        edge_id: row.get(0)?,
        source_node_id: row.get(1)?,
        target_node_id: row.get(2)?,
        transformation_type: row.get(3)?,
        record_count: row.get(4)?,
        created_at_ms: row.get(5)?,
    })
}

impl SnapshotStore {
    /// Record one data-flow edge, enforcing the DAG invariant.
    ///
    /// # Errors
    ///
    /// - `Validation` — empty node ids
    /// - `Cycle` — the source is reachable from the target
    pub fn track_data_flow(
        &self,
        source_node_id: &str,
        target_node_id: &str,
        transformation_type: &str,
        record_count: i64,
    ) -> Result<LineageEdge> {
        let conn = self.lock_conn()?;

        let mut graph = load_graph(&conn)?;
        let edge = graph.track_data_flow(
            source_node_id,
            target_node_id,
            transformation_type,
            record_count,
        )?;

        conn.execute(
            "INSERT INTO lineage_edges (
                edge_id, source_node_id, target_node_id,
                transformation_type, record_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                edge.edge_id,
                edge.source_node_id,
                edge.target_node_id,
                edge.transformation_type,
                edge.record_count,
                edge.created_at.timestamp_millis(),
            ],
        )
        .map_err(from_rusqlite)?;

        tracing::debug!(
            source_node_id,
            target_node_id,
            transformation_type,
            record_count,
            "Tracked data flow edge"
        );
        Ok(edge)
    }

    /// List persisted edges, optionally filtered to those touching one
    /// node (as source or target). Ordered by creation time.
    pub fn list_lineage_edges(&self, node_id: Option<&str>) -> Result<Vec<LineageEdge>> {
        let conn = self.lock_conn()?;
        let sql_all = "SELECT edge_id, source_node_id, target_node_id,
                              transformation_type, record_count, created_at
                       FROM lineage_edges ORDER BY created_at, edge_id";
        let sql_node = "SELECT edge_id, source_node_id, target_node_id,
                               transformation_type, record_count, created_at
                        FROM lineage_edges
                        WHERE source_node_id = ?1 OR target_node_id = ?1
                        ORDER BY created_at, edge_id";

        let raw: std::result::Result<Vec<RawEdgeRow>, _> = match node_id {
            None => {
                let mut stmt = conn.prepare(sql_all).map_err(from_rusqlite)?;
                let rows = stmt.query_map([], edge_from_row).map_err(from_rusqlite)?;
                rows.collect()
            }
            Some(node) => {
                let mut stmt = conn.prepare(sql_node).map_err(from_rusqlite)?;
                let rows = stmt.query_map([node], edge_from_row).map_err(from_rusqlite)?;
                rows.collect()
            }
        };

        raw.map_err(from_rusqlite)?
            .into_iter()
            .map(|row| {
                Ok(LineageEdge {
                    created_at: datetime_from_millis(row.created_at_ms)?,
                    edge_id: row.edge_id,
                    source_node_id: row.source_node_id,
                    target_node_id: row.target_node_id,
                    transformation_type: row.transformation_type,
                    record_count: row.record_count,
                })
            })
            .collect()
    }
}
