//! Integration tests for archgraph
//!
//! Full builds through the public API against file-backed stores, the same
//! wiring the CLI uses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use archgraph_core::{EdgeType, GraphDiff};
use archgraph_engine::{BuildMode, BuildStatus, EngineConfig, EngineContext};
use archgraph_store::{SearchIndex, SyncMode, collections};
use serde_json::Map;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("projects/staff")).unwrap();
        Workspace { dir }
    }

    fn project(&self) -> PathBuf {
        self.dir.path().join("projects/staff")
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.project().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        let root = self.dir.path();
        config.engine.projects_root = root.join("projects");
        config.engine.default_project = "staff".into();
        config.engine.snapshot_dir = root.join("data");
        config.engine.cache_dir = root.join(".archgraph");
        config
    }

    /// A fresh context over the same files, as after a process restart.
    fn open(&self) -> Arc<EngineContext> {
        Arc::new(EngineContext::from_config(self.config()).unwrap())
    }
}

fn snapshot_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_empty_project_still_snapshots() {
    let ws = Workspace::new();
    let context = ws.open();

    let report = context.execute(context.request_for(None).unwrap()).await;
    assert_eq!(report.status, BuildStatus::Completed);

    let graph = context.store().load_graph().await.unwrap().unwrap().graph;
    assert!(graph.nodes.is_empty());
    assert!(graph.edges.is_empty());
    assert_eq!((graph.stats.total_nodes, graph.stats.total_edges), (0, 0));
    assert_eq!(snapshot_count(&ws.dir.path().join("data")), 1);
}

#[tokio::test]
async fn test_imported_name_resolves_to_its_module() {
    let ws = Workspace::new();
    ws.write("a/b.py", "from x.y import bar\n\ndef foo():\n    bar()\n");
    let context = ws.open();
    context.execute(context.request_for(None).unwrap()).await;

    let graph = context.store().load_graph().await.unwrap().unwrap().graph;
    let edge = graph.outgoing("a.b.foo").next().unwrap();
    assert_eq!(edge.target, "x.y.bar");
    assert_eq!(edge.edge_type, EdgeType::Calls);
    // dangling: x.y is not part of the project
    assert!(graph.node("x.y.bar").is_none());
}

#[tokio::test]
async fn test_removed_function_across_restart() {
    let ws = Workspace::new();
    ws.write(
        "app/services/shift/planner.py",
        "def plan_week():\n    validate()\n\ndef validate():\n    pass\n",
    );
    ws.write("app/routes/owner/shifts/api.py", "from app.services.shift.planner import plan_week\n\ndef list_shifts():\n    plan_week()\n");

    let context = ws.open();
    let first = context.execute(context.request_for(None).unwrap()).await;
    assert_eq!(first.index_sync, Some(SyncMode::Full));
    drop(context);

    ws.write("app/services/shift/planner.py", "def plan_week():\n    pass\n");

    let context = ws.open();
    let second = context
        .execute(context.request_for(None).unwrap().with_commit_ref(Some("c2".into())))
        .await;
    assert_eq!(second.status, BuildStatus::Completed);
    assert_eq!(second.index_sync, Some(SyncMode::Incremental));

    let diff: GraphDiff = context.store().load_diff().await.unwrap().unwrap();
    assert_eq!(diff.nodes_removed, vec!["app.services.shift.planner.validate"]);
    assert!(diff.nodes_added.is_empty());
    assert_eq!(diff.edges_removed.len(), 1);
    assert_eq!(diff.commit_ref.as_deref(), Some("c2"));

    let ids: Vec<String> = context
        .store()
        .index()
        .query(collections::NODES, &Map::new())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(
        ids,
        vec![
            "app.routes.owner.shifts.api.list_shifts",
            "app.services.shift.planner.plan_week",
        ]
    );

    let history = context.store().recent_snapshots(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, "c2");
}

#[tokio::test]
async fn test_unchanged_rebuild_is_identical() {
    let ws = Workspace::new();
    ws.write("billing/export.py", "def export_report():\n    render()\n\ndef render():\n    pass\n");
    let context = ws.open();

    context.execute(context.request_for(None).unwrap()).await;
    let first = context.store().load_graph().await.unwrap().unwrap().graph;
    context
        .execute(context.request_for(None).unwrap().with_mode(BuildMode::FullReindex))
        .await;
    let second = context.store().load_graph().await.unwrap().unwrap().graph;

    assert_eq!(first, second);
    assert!(context.store().load_diff().await.unwrap().unwrap().is_empty());
    assert_eq!(snapshot_count(&ws.dir.path().join("data")), 2);
}
