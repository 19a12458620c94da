//! Unit tests for archgraph-store module

use std::sync::Arc;

use archgraph_core::*;
use chrono::{TimeZone, Utc};
use serde_json::{Map, json};

use crate::*;

fn graph(ids: &[&str], edges: &[(&str, &str)]) -> GraphData {
    let nodes = ids
        .iter()
        .map(|id| {
            let label = id.rsplit('.').next().unwrap_or(id);
            Node::function(*id, label, "owner", "shifts", "app/routes/owner/shifts/api.py", (1, 4))
        })
        .collect();
    let edges = edges.iter().map(|(s, t)| Edge::calls(*s, *t)).collect();
    finalize(nodes, edges, &WeightModel::default())
}

struct Fixture {
    _dir: tempfile::TempDir,
    cache: Arc<MemoryCache>,
    index: Arc<LocalIndex>,
    store: GraphStore,
}

fn fixture() -> Fixture {
    let dir = tempfile::TempDir::new().unwrap();
    let cache = Arc::new(MemoryCache::new());
    let index = Arc::new(LocalIndex::in_memory());
    let store = GraphStore::new(cache.clone(), index.clone(), dir.path().join("snapshots"), 3);
    Fixture {
        _dir: dir,
        cache,
        index,
        store,
    }
}

async fn ids(index: &LocalIndex, collection: &str) -> Vec<String> {
    index
        .query(collection, &Map::new())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

#[tokio::test]
async fn test_save_graph_swaps_staging_into_place() {
    let f = fixture();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let g = graph(&["m.a", "m.b"], &[("m.a", "m.b")]);

    assert!(f.store.load_graph().await.unwrap().is_none());
    f.store.save_graph(&g, at).await.unwrap();

    let cached = f.store.load_graph().await.unwrap().unwrap();
    assert_eq!(cached.graph, g);
    assert_eq!(cached.updated_at, at);
    assert!(f.cache.get(keys::GRAPH_STAGING).await.unwrap().is_none());

    let stats: serde_json::Value = f.store.get_json(keys::STATS).await.unwrap().unwrap();
    assert_eq!(stats["total_nodes"], 2);
    assert_eq!(stats["total_edges"], 1);
}

#[tokio::test]
async fn test_corrupt_graph_counts_as_absent() {
    let f = fixture();
    f.cache.set(keys::GRAPH, "{\"nodes\": [".into()).await.unwrap();
    assert!(f.store.load_graph().await.unwrap().is_none());
    assert_eq!(f.store.meta().await.unwrap().updated_at, None);
}

#[tokio::test]
async fn test_full_sync_replaces_everything() {
    let f = fixture();
    f.store
        .sync_index_full(&graph(&["m.old"], &[("m.old", "os.getcwd")]))
        .await
        .unwrap();

    // duplicate call sites collapse into one edge record
    let g = graph(&["m.a", "m.b"], &[("m.a", "m.b"), ("m.a", "m.b")]);
    let sync = f.store.sync_index_full(&g).await.unwrap();
    insta::assert_json_snapshot!(sync, @r#"
    {
      "mode": "full",
      "deleted": 2,
      "inserted": 3
    }
    "#);

    assert_eq!(ids(&f.index, collections::NODES).await, vec!["m.a", "m.b"]);
    assert_eq!(ids(&f.index, collections::EDGES).await, vec!["m.a|calls|m.b"]);
}

#[tokio::test]
async fn test_node_records_carry_metadata() {
    let f = fixture();
    f.store.sync_index_full(&graph(&["app.api.list_shifts"], &[])).await.unwrap();

    let records = f
        .index
        .get(collections::NODES, &["app.api.list_shifts".to_string()])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document, "list_shifts");
    assert_eq!(
        serde_json::Value::Object(records[0].metadata.clone()),
        json!({
            "type": "function",
            "role": "owner",
            "subsystem": "shifts",
            "file": "app/routes/owner/shifts/api.py",
            "lines": "1-4",
            // 0.9*0.4 + 0.5*0.3 + 0
            "weight": 0.51,
            "degree_in": 0,
            "degree_out": 0,
        })
    );
}

#[tokio::test]
async fn test_incremental_sync_applies_diff() {
    let f = fixture();
    let g1 = graph(&["m.a", "m.b", "m.c"], &[("m.a", "m.b"), ("m.b", "m.c")]);
    let g2 = graph(&["m.a", "m.b", "m.d"], &[("m.a", "m.b"), ("m.b", "m.d")]);
    f.store.sync_index_full(&g1).await.unwrap();

    let diff = compute_diff(Some(&g1), &g2).unwrap();
    let sync = f.store.sync_index_incremental(&g2, &diff).await.unwrap();
    assert_eq!(sync.mode, SyncMode::Incremental);
    assert_eq!((sync.deleted, sync.inserted), (2, 2));

    assert_eq!(ids(&f.index, collections::NODES).await, vec!["m.a", "m.b", "m.d"]);
    assert_eq!(
        ids(&f.index, collections::EDGES).await,
        vec!["m.a|calls|m.b", "m.b|calls|m.d"]
    );
}

#[tokio::test]
async fn test_incremental_sync_is_idempotent() {
    let f = fixture();
    let g1 = graph(&["m.a", "m.b"], &[("m.a", "m.b")]);
    let g2 = graph(&["m.a", "m.c"], &[("m.a", "m.c")]);
    f.store.sync_index_full(&g1).await.unwrap();
    let diff = compute_diff(Some(&g1), &g2).unwrap();

    f.store.sync_index_incremental(&g2, &diff).await.unwrap();
    let nodes_once = f.index.query(collections::NODES, &Map::new()).await.unwrap();
    let edges_once = f.index.query(collections::EDGES, &Map::new()).await.unwrap();

    let replay = f.store.sync_index_incremental(&g2, &diff).await.unwrap();
    assert_eq!((replay.deleted, replay.inserted), (0, 0));
    assert_eq!(f.index.query(collections::NODES, &Map::new()).await.unwrap(), nodes_once);
    assert_eq!(f.index.query(collections::EDGES, &Map::new()).await.unwrap(), edges_once);
}

#[tokio::test]
async fn test_node_with_edges_and_meta() {
    let f = fixture();
    let g = graph(&["m.a", "m.b"], &[("m.a", "m.b"), ("m.b", "json.dumps")]);
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    f.store.save_graph(&g, at).await.unwrap();

    let view = f.store.node_with_edges("m.b").await.unwrap().unwrap();
    assert_eq!(view.node.id, "m.b");
    assert_eq!(view.incoming, vec![Edge::calls("m.a", "m.b")]);
    assert_eq!(view.outgoing, vec![Edge::calls("m.b", "json.dumps")]);
    assert!(f.store.node_with_edges("json.dumps").await.unwrap().is_none());

    let meta = f.store.meta().await.unwrap();
    assert_eq!(meta.roles, vec!["owner"]);
    assert_eq!(meta.subsystems, vec!["shifts"]);
    assert_eq!(meta.stats, GraphStats { total_nodes: 2, total_edges: 2 });
    assert_eq!(meta.updated_at, Some(at));
}

#[tokio::test]
async fn test_weight_updates_merge() {
    let f = fixture();
    let mut update = WeightOverrides::default();
    update.roles.insert("owner".into(), 1.0);
    f.store.update_weights(&update).await.unwrap();

    let mut update = WeightOverrides::default();
    update.roles.insert("manager".into(), 0.2);
    update.subsystems.insert("billing".into(), 0.9);
    let merged = f.store.update_weights(&update).await.unwrap();

    assert_eq!(merged.roles.get("owner"), Some(&1.0));
    assert_eq!(merged.roles.get("manager"), Some(&0.2));
    assert_eq!(merged.subsystems.get("billing"), Some(&0.9));
    assert_eq!(f.store.load_weights().await.unwrap(), merged);
}

#[tokio::test]
async fn test_record_snapshot_is_bounded_and_indexed() {
    let f = fixture();
    for i in 0..5 {
        let meta = SnapshotMeta {
            id: format!("snap-{}", i),
            project: "demo".into(),
            commit_ref: None,
            node_count: i,
            edge_count: 0,
            created_at: Utc::now(),
        };
        f.store.record_snapshot(&meta).await.unwrap();
    }
    // replaying the same id is harmless
    let again = f.store.recent_snapshots(1).await.unwrap().remove(0);
    f.store.record_snapshot(&again).await.unwrap();

    let recent: Vec<_> = f
        .store
        .recent_snapshots(10)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(recent, vec!["snap-4", "snap-4", "snap-3"]);
    assert_eq!(f.index.count(collections::SNAPSHOTS).await.unwrap(), 5);
}

#[tokio::test]
async fn test_clear_removes_keys_and_collections() {
    let f = fixture();
    let g = graph(&["m.a"], &[]);
    f.store.save_graph(&g, Utc::now()).await.unwrap();
    f.store.sync_index_full(&g).await.unwrap();
    f.store.write_snapshot(&g, Utc::now()).await.unwrap();

    f.store.clear().await.unwrap();
    assert!(f.cache.is_empty());
    assert_eq!(f.index.count(collections::NODES).await.unwrap(), 0);
    assert_eq!(f.store.snapshots().list().await.unwrap().len(), 1);
}
