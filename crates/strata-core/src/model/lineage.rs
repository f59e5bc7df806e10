//! Directed data-flow edges between processing nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One directed edge in the lineage DAG: data flowed from
/// `source_node_id` into `target_node_id` through a transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEdge {
    /// Unique edge identifier (UUIDv7)
    pub edge_id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    /// E.g. "pipeline", "join", "import"
    pub transformation_type: String,
    /// Records that flowed along this edge
    pub record_count: i64,
    pub created_at: DateTime<Utc>,
}

impl LineageEdge {
    pub fn new(
        source_node_id: impl Into<String>,
        target_node_id: impl Into<String>,
        transformation_type: impl Into<String>,
        record_count: i64,
    ) -> Self {
        Self {
            edge_id: Uuid::now_v7().to_string(),
            source_node_id: source_node_id.into(),
            target_node_id: target_node_id.into(),
            transformation_type: transformation_type.into(),
            record_count,
            created_at: Utc::now(),
        }
    }
}
