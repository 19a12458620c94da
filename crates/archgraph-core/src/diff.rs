//! Structural diff between two graph generations

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::*;

/// Delta between the previous and the current graph.
///
/// Edges are compared as `(source, target, type)` triples; identical edges
/// collapse to one, so multiplicity changes are not reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDiff {
    pub nodes_added: Vec<String>,
    pub nodes_removed: Vec<String>,
    /// Sorted by `(source, target)`.
    pub edges_added: Vec<Edge>,
    /// Sorted by `(source, target)`.
    pub edges_removed: Vec<Edge>,
    pub prev_stats: GraphStats,
    pub cur_stats: GraphStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl GraphDiff {
    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.nodes_added.is_empty()
            && self.nodes_removed.is_empty()
            && self.edges_added.is_empty()
            && self.edges_removed.is_empty()
    }

    pub fn with_commit_ref(mut self, commit_ref: Option<String>) -> Self {
        self.commit_ref = commit_ref;
        self
    }

    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Apply this diff to the id sets of the previous graph.
    pub fn apply_to(&self, node_ids: &mut BTreeSet<String>, edges: &mut BTreeSet<Edge>) {
        for id in &self.nodes_removed {
            node_ids.remove(id);
        }
        node_ids.extend(self.nodes_added.iter().cloned());
        for edge in &self.edges_removed {
            edges.remove(edge);
        }
        edges.extend(self.edges_added.iter().cloned());
    }
}

/// Compare `previous` with `current`.
///
/// Returns `None` when there is no previous graph: the first build is a
/// bootstrap, never a diff against an empty graph.
pub fn compute_diff(previous: Option<&GraphData>, current: &GraphData) -> Option<GraphDiff> {
    let previous = previous?;

    let prev_nodes = previous.node_ids();
    let cur_nodes = current.node_ids();
    let prev_edges = previous.edge_set();
    let cur_edges = current.edge_set();

    let diff = GraphDiff {
        nodes_added: cur_nodes.difference(&prev_nodes).cloned().collect(),
        nodes_removed: prev_nodes.difference(&cur_nodes).cloned().collect(),
        // BTreeSet<Edge> iterates in (source, target, type) order already.
        edges_added: cur_edges.difference(&prev_edges).cloned().collect(),
        edges_removed: prev_edges.difference(&cur_edges).cloned().collect(),
        prev_stats: previous.stats,
        cur_stats: current.stats,
        commit_ref: None,
        generated_at: None,
    };

    tracing::debug!(
        "Diff: +{} -{} nodes, +{} -{} edges",
        diff.nodes_added.len(),
        diff.nodes_removed.len(),
        diff.edges_added.len(),
        diff.edges_removed.len()
    );

    Some(diff)
}
