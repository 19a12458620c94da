//! Degree computation and graph finalization

use std::collections::HashMap;

use crate::model::*;
use crate::weights::WeightModel;

/// Recompute `degree_in`/`degree_out` for every node from scratch in a single
/// pass over `edges`. Edge endpoints that are not nodes are ignored.
///
/// Returns the largest `degree_in + degree_out`, floored at 1.
pub fn compute_degrees(nodes: &mut [Node], edges: &[Edge]) -> u32 {
    let mut counts: HashMap<&str, (u32, u32)> = HashMap::new();
    for edge in edges {
        counts.entry(edge.source.as_str()).or_default().1 += 1;
        counts.entry(edge.target.as_str()).or_default().0 += 1;
    }

    let mut max_degree = 0;
    for node in nodes.iter_mut() {
        let (degree_in, degree_out) = counts.get(node.id.as_str()).copied().unwrap_or_default();
        node.degree_in = degree_in;
        node.degree_out = degree_out;
        max_degree = max_degree.max(degree_in + degree_out);
    }
    max_degree.max(1)
}

/// Turn collected nodes and edges into an immutable [`GraphData`]: degrees,
/// weights and stats are all derived here.
pub fn finalize(mut nodes: Vec<Node>, edges: Vec<Edge>, weights: &WeightModel) -> GraphData {
    let max_degree = compute_degrees(&mut nodes, &edges);
    for node in &mut nodes {
        node.weight = weights.weight(
            &node.role,
            &node.subsystem,
            node.degree_in,
            node.degree_out,
            max_degree,
        );
    }

    tracing::debug!(
        "Finalized graph: {} nodes, {} edges, max degree {}",
        nodes.len(),
        edges.len(),
        max_degree
    );

    let stats = GraphStats {
        total_nodes: nodes.len(),
        total_edges: edges.len(),
    };
    GraphData { nodes, edges, stats }
}
