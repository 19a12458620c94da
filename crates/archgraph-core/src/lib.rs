//! Archgraph Core: call-graph data model, weighting and diff engine

pub mod model;
pub mod graph;
pub mod weights;
pub mod diff;
pub mod history;
pub mod diagram;

#[cfg(test)]
pub mod tests;

pub use model::{Node, Edge, NodeType, EdgeType, GraphStats, GraphData, SnapshotMeta};
pub use graph::{compute_degrees, finalize};
pub use weights::{WeightModel, WeightOverrides, connectivity};
pub use diff::{GraphDiff, compute_diff};
pub use history::{BoundedHistory, DEFAULT_HISTORY_CAPACITY};
pub use diagram::{MERMAID_EDGE_LIMIT, mermaid};
