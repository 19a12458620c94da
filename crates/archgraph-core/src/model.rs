//! Core data structures for the call graph

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminates what kind of architectural entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Function,
    Role,
    Subsystem,
    Task,
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Calls,
    BelongsTo,
    PartOf,
    RelatesTo,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Calls => "calls",
            EdgeType::BelongsTo => "belongs_to",
            EdgeType::PartOf => "part_of",
            EdgeType::RelatesTo => "relates_to",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Function => "function",
            NodeType::Role => "role",
            NodeType::Subsystem => "subsystem",
            NodeType::Task => "task",
        }
    }
}

/// A single node in the call graph.
///
/// `id` is the fully-qualified name (`module.path.symbol`) and is the only key;
/// it stays stable across builds as long as the symbol and its file do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub role: String,
    pub subsystem: String,
    /// Path relative to the project root, `/`-separated.
    pub file: String,
    pub line_start: u32,
    pub line_end: u32,
    pub weight: f64,
    pub degree_in: u32,
    pub degree_out: u32,
}

impl Node {
    /// A function node with zeroed degree and weight; both are filled in
    /// once the whole graph has been collected.
    pub fn function(
        id: impl Into<String>,
        label: impl Into<String>,
        role: impl Into<String>,
        subsystem: impl Into<String>,
        file: impl Into<String>,
        lines: (u32, u32),
    ) -> Self {
        Node {
            id: id.into(),
            label: label.into(),
            node_type: NodeType::Function,
            role: role.into(),
            subsystem: subsystem.into(),
            file: file.into(),
            line_start: lines.0,
            line_end: lines.1,
            weight: 0.0,
            degree_in: 0,
            degree_out: 0,
        }
    }

    /// Line range rendered as `start-end`.
    pub fn lines(&self) -> String {
        format!("{}-{}", self.line_start, self.line_end)
    }
}

/// A directed edge. The target does not have to exist as a node: calls into
/// the standard library, third-party or unscanned code stay dangling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_type: EdgeType) -> Self {
        Edge {
            source: source.into(),
            target: target.into(),
            edge_type,
        }
    }

    pub fn calls(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(source, target, EdgeType::Calls)
    }

    /// Identifier used for the edge's search-index record.
    pub fn record_id(&self) -> String {
        format!("{}|{}|{}", self.source, self.edge_type, self.target)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
}

/// The output of one build. Never mutated after construction: it is
/// superseded in the cache, appended as a snapshot, or diffed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub stats: GraphStats,
}

impl GraphData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges whose target is `id`.
    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Edges whose source is `id`.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn node_ids(&self) -> BTreeSet<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Edge set with duplicates collapsed.
    pub fn edge_set(&self) -> BTreeSet<Edge> {
        self.edges.iter().cloned().collect()
    }

    /// Distinct non-empty roles, sorted.
    pub fn roles(&self) -> Vec<String> {
        distinct(self.nodes.iter().map(|n| n.role.as_str()))
    }

    /// Distinct non-empty subsystems, sorted.
    pub fn subsystems(&self) -> Vec<String> {
        distinct(self.nodes.iter().map(|n| n.subsystem.as_str()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// One entry of the snapshot history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub id: String,
    pub project: String,
    pub commit_ref: Option<String>,
    pub node_count: usize,
    pub edge_count: usize,
    pub created_at: DateTime<Utc>,
}
