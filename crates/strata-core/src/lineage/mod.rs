//! Lineage DAG with cycle prevention.
//!
//! Lineage is defined to be a DAG. Before an edge is inserted the graph
//! runs an iterative depth-first reachability check from the prospective
//! target; if the prospective source is reachable, the edge would close
//! a cycle and is rejected.

use crate::errors::{Result, StrataError, StrataErrorKind};
use crate::model::lineage::LineageEdge;
use std::collections::{BTreeMap, BTreeSet};

/// Adjacency view of the lineage edge set.
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    /// node → direct successors
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the adjacency view from persisted edges
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a LineageEdge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.insert_unchecked(&edge.source_node_id, &edge.target_node_id);
        }
        graph
    }

    /// Insert an adjacency entry without a cycle check (loading persisted
    /// edges, which were checked when written)
    pub fn insert_unchecked(&mut self, source: &str, target: &str) {
        self.adjacency
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
    }

    /// True if `to` is reachable from `from` by following edges forward.
    /// Iterative DFS; a node does not reach itself unless a path exists.
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        let mut stack: Vec<&str> = vec![from];
        let mut visited: BTreeSet<&str> = BTreeSet::new();

        while let Some(node) = stack.pop() {
            let Some(successors) = self.adjacency.get(node) else {
                continue;
            };
            for next in successors {
                if next == to {
                    return true;
                }
                if visited.insert(next.as_str()) {
                    stack.push(next);
                }
            }
        }
        false
    }

    /// True if adding `source -> target` would close a cycle
    pub fn would_create_cycle(&self, source: &str, target: &str) -> bool {
        source == target || self.is_reachable(target, source)
    }

    /// Validate and record a new data-flow edge.
    ///
    /// # Errors
    ///
    /// - `Validation` — source or target node id is empty
    /// - `Cycle` — the source is reachable from the target (or the edge
    ///   is a self-loop)
    pub fn track_data_flow(
        &mut self,
        source_node_id: &str,
        target_node_id: &str,
        transformation_type: &str,
        record_count: i64,
    ) -> Result<LineageEdge> {
        if source_node_id.is_empty() || target_node_id.is_empty() {
            return Err(StrataError::new(StrataErrorKind::Validation)
                .with_op("track_data_flow")
                .with_message("source and target node ids must not be empty"));
        }

        if self.would_create_cycle(source_node_id, target_node_id) {
            return Err(StrataError::new(StrataErrorKind::Cycle)
                .with_op("track_data_flow")
                .with_message(format!(
                    "edge {} -> {} would create a cycle in the lineage graph",
                    source_node_id, target_node_id
                )));
        }

        self.insert_unchecked(source_node_id, target_node_id);
        Ok(LineageEdge::new(
            source_node_id,
            target_node_id,
            transformation_type,
            record_count,
        ))
    }
}
