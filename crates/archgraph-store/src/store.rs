//! GraphStore: persistence facade over cache, search index and snapshots
//!
//! Each destination has its own consistency rule:
//! - cache: full replace through a staging key and an atomic rename
//! - snapshot: one new immutable file per build
//! - search index: full rebuild or diff-driven incremental sync, both safe
//!   to replay
//!
//! There is no cross-destination transaction; callers sequence the steps and
//! report partial failures themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use archgraph_core::{
    Edge, GraphData, GraphDiff, GraphStats, Node, SnapshotMeta, WeightOverrides,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
    IndexRecord, KvCache, SearchIndex, Selector, SnapshotRegistry, SnapshotWriter, StoreError,
};

/// Cache keys.
pub mod keys {
    pub const GRAPH: &str = "arch:graph";
    pub const GRAPH_STAGING: &str = "arch:graph:new";
    pub const STATS: &str = "arch:stats";
    pub const DIFF: &str = "arch:diff";
    pub const ROLE_WEIGHTS: &str = "arch:weights:roles";
    pub const SUBSYSTEM_WEIGHTS: &str = "arch:weights:subsystems";
    pub const SNAPSHOTS: &str = "arch:snapshots";
    pub const TASKS: &str = "arch:tasks";

    pub const ALL: &[&str] = &[
        GRAPH,
        GRAPH_STAGING,
        STATS,
        DIFF,
        ROLE_WEIGHTS,
        SUBSYSTEM_WEIGHTS,
        SNAPSHOTS,
        TASKS,
    ];
}

/// Search-index collections.
pub mod collections {
    pub const NODES: &str = "arch_nodes";
    pub const EDGES: &str = "arch_edges";
    pub const SNAPSHOTS: &str = "arch_snapshots";

    pub const ALL: &[&str] = &[NODES, EDGES, SNAPSHOTS];
}

/// The canonical graph as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedGraph {
    #[serde(flatten)]
    pub graph: GraphData,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Full,
    Incremental,
}

/// What one search-index sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSync {
    pub mode: SyncMode,
    pub deleted: usize,
    pub inserted: usize,
}

/// A node with its incident edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub node: Node,
    pub incoming: Vec<Edge>,
    pub outgoing: Vec<Edge>,
}

/// Aggregate metadata of the current graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMeta {
    pub roles: Vec<String>,
    pub subsystems: Vec<String>,
    pub stats: GraphStats,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatsEntry {
    #[serde(flatten)]
    stats: GraphStats,
    updated_at: DateTime<Utc>,
}

pub struct GraphStore {
    cache: Arc<dyn KvCache>,
    index: Arc<dyn SearchIndex>,
    snapshots: SnapshotWriter,
    registry: SnapshotRegistry,
}

impl GraphStore {
    pub fn new(
        cache: Arc<dyn KvCache>,
        index: Arc<dyn SearchIndex>,
        snapshot_dir: impl Into<PathBuf>,
        history_capacity: usize,
    ) -> Self {
        let registry = SnapshotRegistry::new(Arc::clone(&cache), keys::SNAPSHOTS, history_capacity);
        GraphStore {
            cache,
            index,
            snapshots: SnapshotWriter::new(snapshot_dir),
            registry,
        }
    }

    pub fn snapshots(&self) -> &SnapshotWriter {
        &self.snapshots
    }

    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    // ── Generic JSON values ───────────────────────────────

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.cache.get(key).await? {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        }
    }

    pub async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.cache.set(key, serde_json::to_string(value)?).await
    }

    /// Like [`get_json`](Self::get_json), but an unreadable value is logged
    /// and reported as absent.
    async fn get_json_lenient<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_json(key).await {
            Err(StoreError::Serde(e)) => {
                tracing::warn!("Ignoring corrupt cache entry {}: {}", key, e);
                Ok(None)
            }
            other => other,
        }
    }

    // ── Cache ─────────────────────────────────────────────

    /// The canonical graph, if any. A corrupt entry counts as absent.
    pub async fn load_graph(&self) -> Result<Option<CachedGraph>, StoreError> {
        self.get_json_lenient(keys::GRAPH).await
    }

    /// Replace the canonical graph: write the staging key, then rename it
    /// over the canonical one. Stats are refreshed afterwards.
    pub async fn save_graph(&self, graph: &GraphData, at: DateTime<Utc>) -> Result<(), StoreError> {
        let entry = CachedGraph {
            graph: graph.clone(),
            updated_at: at,
        };
        self.put_json(keys::GRAPH_STAGING, &entry).await?;
        self.cache.rename(keys::GRAPH_STAGING, keys::GRAPH).await?;
        self.put_json(
            keys::STATS,
            &StatsEntry {
                stats: graph.stats,
                updated_at: at,
            },
        )
        .await?;
        tracing::info!(
            "Cache updated: {} nodes, {} edges",
            graph.stats.total_nodes,
            graph.stats.total_edges
        );
        Ok(())
    }

    pub async fn save_diff(&self, diff: &GraphDiff) -> Result<(), StoreError> {
        self.put_json(keys::DIFF, diff).await
    }

    pub async fn load_diff(&self) -> Result<Option<GraphDiff>, StoreError> {
        self.get_json_lenient(keys::DIFF).await
    }

    // ── Snapshots ─────────────────────────────────────────

    pub async fn write_snapshot(&self, graph: &GraphData, at: DateTime<Utc>) -> Result<PathBuf, StoreError> {
        self.snapshots.write(graph, at).await
    }

    /// Push `meta` onto the bounded history and mirror it into the index.
    pub async fn record_snapshot(&self, meta: &SnapshotMeta) -> Result<(), StoreError> {
        self.registry.record(meta.clone()).await?;
        let metadata = to_metadata(json!({
            "project": meta.project,
            "commit_ref": meta.commit_ref.clone().unwrap_or_default(),
            "node_count": meta.node_count,
            "edge_count": meta.edge_count,
            "created_at": meta.created_at.to_rfc3339(),
        }));
        let record = IndexRecord::new(meta.id.clone(), meta.id.clone(), metadata);
        tolerate_existing(self.index.add(collections::SNAPSHOTS, vec![record]).await)?;
        Ok(())
    }

    pub async fn recent_snapshots(&self, limit: usize) -> Result<Vec<SnapshotMeta>, StoreError> {
        self.registry.recent(limit).await
    }

    // ── Search index ──────────────────────────────────────

    /// Drop every node and edge record, then insert the whole graph.
    pub async fn sync_index_full(&self, graph: &GraphData) -> Result<IndexSync, StoreError> {
        let mut deleted = self.index.delete(collections::NODES, Selector::All).await?;
        deleted += self.index.delete(collections::EDGES, Selector::All).await?;

        let mut inserted = 0;
        if !graph.nodes.is_empty() {
            let records = graph.nodes.iter().map(node_record).collect();
            inserted += tolerate_existing(self.index.add(collections::NODES, records).await)?;
        }
        let edges = edge_records(graph.edges.iter());
        if !edges.is_empty() {
            inserted += tolerate_existing(self.index.add(collections::EDGES, edges).await)?;
        }

        tracing::info!("Search index rebuilt: {} removed, {} inserted", deleted, inserted);
        Ok(IndexSync {
            mode: SyncMode::Full,
            deleted,
            inserted,
        })
    }

    /// Apply `diff` to the index: remove what disappeared, add what is new.
    /// Replaying the same diff leaves the index unchanged.
    pub async fn sync_index_incremental(
        &self,
        graph: &GraphData,
        diff: &GraphDiff,
    ) -> Result<IndexSync, StoreError> {
        let mut deleted = 0;
        if !diff.nodes_removed.is_empty() {
            deleted += self
                .index
                .delete(collections::NODES, Selector::Ids(diff.nodes_removed.clone()))
                .await?;
        }
        if !diff.edges_removed.is_empty() {
            let ids = diff.edges_removed.iter().map(Edge::record_id).collect();
            deleted += self.index.delete(collections::EDGES, Selector::Ids(ids)).await?;
        }

        let mut inserted = 0;
        let added: BTreeSet<&str> = diff.nodes_added.iter().map(String::as_str).collect();
        let nodes: Vec<IndexRecord> = graph
            .nodes
            .iter()
            .filter(|n| added.contains(n.id.as_str()))
            .map(node_record)
            .collect();
        if !nodes.is_empty() {
            inserted += tolerate_existing(self.index.add(collections::NODES, nodes).await)?;
        }
        let edges = edge_records(diff.edges_added.iter());
        if !edges.is_empty() {
            inserted += tolerate_existing(self.index.add(collections::EDGES, edges).await)?;
        }

        tracing::info!("Search index synced: {} removed, {} inserted", deleted, inserted);
        Ok(IndexSync {
            mode: SyncMode::Incremental,
            deleted,
            inserted,
        })
    }

    // ── Read contract ─────────────────────────────────────

    pub async fn node_with_edges(&self, id: &str) -> Result<Option<NodeView>, StoreError> {
        let Some(cached) = self.load_graph().await? else {
            return Ok(None);
        };
        let graph = cached.graph;
        Ok(graph.node(id).cloned().map(|node| NodeView {
            node,
            incoming: graph.incoming(id).cloned().collect(),
            outgoing: graph.outgoing(id).cloned().collect(),
        }))
    }

    pub async fn meta(&self) -> Result<GraphMeta, StoreError> {
        Ok(match self.load_graph().await? {
            Some(cached) => GraphMeta {
                roles: cached.graph.roles(),
                subsystems: cached.graph.subsystems(),
                stats: cached.graph.stats,
                updated_at: Some(cached.updated_at),
            },
            None => GraphMeta {
                roles: Vec::new(),
                subsystems: Vec::new(),
                stats: GraphStats::default(),
                updated_at: None,
            },
        })
    }

    // ── Weight overrides ──────────────────────────────────

    pub async fn load_weights(&self) -> Result<WeightOverrides, StoreError> {
        let roles: Option<BTreeMap<String, f64>> = self.get_json_lenient(keys::ROLE_WEIGHTS).await?;
        let subsystems: Option<BTreeMap<String, f64>> =
            self.get_json_lenient(keys::SUBSYSTEM_WEIGHTS).await?;
        Ok(WeightOverrides {
            roles: roles.unwrap_or_default(),
            subsystems: subsystems.unwrap_or_default(),
        })
    }

    /// Merge `update` into the stored overrides key by key and return the
    /// result. Takes effect on the next build.
    pub async fn update_weights(&self, update: &WeightOverrides) -> Result<WeightOverrides, StoreError> {
        let mut current = self.load_weights().await?;
        if !update.roles.is_empty() {
            current.roles.extend(update.roles.iter().map(|(k, v)| (k.clone(), *v)));
            self.put_json(keys::ROLE_WEIGHTS, &current.roles).await?;
        }
        if !update.subsystems.is_empty() {
            current
                .subsystems
                .extend(update.subsystems.iter().map(|(k, v)| (k.clone(), *v)));
            self.put_json(keys::SUBSYSTEM_WEIGHTS, &current.subsystems).await?;
        }
        Ok(current)
    }

    /// Remove every key and index collection this store owns. Snapshot files
    /// are left in place.
    pub async fn clear(&self) -> Result<(), StoreError> {
        for key in keys::ALL {
            self.cache.delete(key).await?;
        }
        for collection in collections::ALL {
            self.index.delete(collection, Selector::All).await?;
        }
        tracing::info!("Cleared cache keys and search index collections");
        Ok(())
    }
}

/// Inserts of records that already exist count as success.
fn tolerate_existing(result: Result<usize, StoreError>) -> Result<usize, StoreError> {
    match result {
        Err(StoreError::AlreadyExists { collection, ids }) => {
            tracing::debug!("{}: {} record(s) already present", collection, ids.len());
            Ok(0)
        }
        other => other,
    }
}

fn to_metadata(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn node_record(node: &Node) -> IndexRecord {
    let metadata = to_metadata(json!({
        "type": node.node_type.as_str(),
        "role": node.role,
        "subsystem": node.subsystem,
        "file": node.file,
        "lines": node.lines(),
        "weight": node.weight,
        "degree_in": node.degree_in,
        "degree_out": node.degree_out,
    }));
    IndexRecord::new(node.id.clone(), node.label.clone(), metadata)
}

/// One record per distinct edge, in id order.
fn edge_records<'a>(edges: impl Iterator<Item = &'a Edge>) -> Vec<IndexRecord> {
    let mut records = BTreeMap::new();
    for edge in edges {
        records.entry(edge.record_id()).or_insert_with(|| {
            let metadata = to_metadata(json!({
                "source": edge.source,
                "target": edge.target,
                "type": edge.edge_type.as_str(),
            }));
            IndexRecord::new(edge.record_id(), edge.edge_type.as_str(), metadata)
        });
    }
    records.into_values().collect()
}
