//! Build pipeline
//!
//! `INIT → LOAD_PREVIOUS → PARSE → DIFF → PERSIST → NOTIFY → DONE`
//!
//! The project lease is taken before LOAD_PREVIOUS and held through PERSIST,
//! so the previous graph a diff is computed against is still the canonical
//! one when the diff is applied. A missing previous graph turns the build
//! into a bootstrap: no diff, full index rebuild. PERSIST writes the diff, the search index, the cache, the
//! snapshot file and the registry in that order with no rollback; a failure
//! after the first write is reported as [`BuildStatus::Inconsistent`].
//! Notification failures are logged and otherwise ignored.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use archgraph_core::{SnapshotMeta, WeightModel, compute_diff};
use archgraph_indexer::tasks::{collect_tasks, relate_tasks};
use archgraph_indexer::{GraphBuilder, IndexError, TaskSync};
use archgraph_store::{StoreError, keys};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::EngineContext;
use crate::notify::{BuildEvent, EventKind};
use crate::report::{BuildReport, BuildStatus, Destination, Phase};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// Incremental index sync when a previous graph exists.
    #[default]
    Auto,
    /// Always rebuild the search index from scratch.
    FullReindex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    pub project: String,
    pub root: PathBuf,
    pub commit_ref: Option<String>,
    pub mode: BuildMode,
}

impl BuildRequest {
    pub fn new(project: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        BuildRequest {
            project: project.into(),
            root: root.into(),
            commit_ref: None,
            mode: BuildMode::Auto,
        }
    }

    pub fn with_commit_ref(mut self, commit_ref: Option<String>) -> Self {
        self.commit_ref = commit_ref;
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    fn event_kind(&self) -> EventKind {
        match self.mode {
            BuildMode::FullReindex => EventKind::ReindexComplete,
            BuildMode::Auto => EventKind::AnalyzeComplete,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("{phase:?} failed: {source}")]
    Store { phase: Phase, source: StoreError },

    #[error("another build holds the lease for project {0}")]
    LeaseHeld(String),

    #[error("invalid project name {0:?}")]
    InvalidProject(String),

    #[error("parse task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("persisted {persisted:?}, then {failed:?} failed: {source}")]
    Inconsistent {
        persisted: Vec<Destination>,
        failed: Destination,
        source: StoreError,
    },
}

impl BuildError {
    pub fn phase(&self) -> Phase {
        match self {
            BuildError::Index(_) | BuildError::Join(_) => Phase::Parse,
            BuildError::Store { phase, .. } => *phase,
            BuildError::LeaseHeld(_) | BuildError::InvalidProject(_) => Phase::Init,
            BuildError::Inconsistent { .. } => Phase::Persist,
        }
    }

    pub fn to_status(&self) -> BuildStatus {
        match self {
            BuildError::Inconsistent {
                persisted,
                failed,
                source,
            } => BuildStatus::Inconsistent {
                persisted: persisted.clone(),
                failed: *failed,
                error: source.to_string(),
            },
            other => BuildStatus::Failed {
                phase: other.phase(),
                error: other.to_string(),
            },
        }
    }
}

fn store_error(phase: Phase) -> impl FnOnce(StoreError) -> BuildError {
    move |source| BuildError::Store { phase, source }
}

/// Immediate reply to a build trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerAck {
    pub status: &'static str,
    pub project: String,
    pub commit_ref: Option<String>,
}

/// Tracks which PERSIST destinations have been written so far.
#[derive(Default)]
struct PersistLog {
    persisted: Vec<Destination>,
}

impl PersistLog {
    async fn step<T>(
        &mut self,
        destination: Destination,
        write: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, BuildError> {
        match write.await {
            Ok(value) => {
                self.persisted.push(destination);
                Ok(value)
            }
            Err(source) if self.persisted.is_empty() => Err(BuildError::Store {
                phase: Phase::Persist,
                source,
            }),
            Err(source) => Err(BuildError::Inconsistent {
                persisted: self.persisted.clone(),
                failed: destination,
                source,
            }),
        }
    }
}

impl EngineContext {
    /// Run one build to completion. The returned report is `Completed`; every
    /// other outcome is an error.
    pub async fn run_build(
        &self,
        request: &BuildRequest,
        started_at: DateTime<Utc>,
    ) -> Result<BuildReport, BuildError> {
        tracing::info!(
            "Build started: project {} at {} ({:?})",
            request.project,
            request.root.display(),
            request.mode
        );

        let lease = self
            .leases()
            .try_acquire(&request.project)
            .ok_or_else(|| BuildError::LeaseHeld(request.project.clone()))?;

        // LOAD_PREVIOUS
        let previous = self
            .store()
            .load_graph()
            .await
            .map_err(store_error(Phase::LoadPrevious))?
            .map(|cached| cached.graph);
        if previous.is_none() {
            tracing::info!("No previous graph, bootstrapping");
        }
        let stored_weights = self
            .store()
            .load_weights()
            .await
            .map_err(store_error(Phase::LoadPrevious))?;
        let mut weights = WeightModel::with_overrides(&self.config().weights);
        weights.apply(&stored_weights);

        // PARSE
        let builder = GraphBuilder::new(&request.root)
            .with_scan_options(self.config().scan.clone())
            .with_weights(weights);
        let graph = tokio::task::spawn_blocking(move || builder.build()).await??;

        // DIFF
        let now = Utc::now();
        let diff = compute_diff(previous.as_ref(), &graph)
            .map(|diff| diff.with_commit_ref(request.commit_ref.clone()).stamped(now));

        // PERSIST
        let mut log = PersistLog::default();

        if let Some(diff) = &diff {
            log.step(Destination::Diff, self.store().save_diff(diff)).await?;
        }
        let sync = match (&diff, request.mode) {
            (Some(diff), BuildMode::Auto) => {
                log.step(
                    Destination::SearchIndex,
                    self.store().sync_index_incremental(&graph, diff),
                )
                .await?
            }
            _ => {
                log.step(Destination::SearchIndex, self.store().sync_index_full(&graph))
                    .await?
            }
        };
        log.step(Destination::Cache, self.store().save_graph(&graph, now))
            .await?;
        let path = log
            .step(Destination::Snapshot, self.store().write_snapshot(&graph, now))
            .await?;

        let snapshot_id = match &request.commit_ref {
            Some(commit_ref) => commit_ref.clone(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
        };
        let meta = SnapshotMeta {
            id: snapshot_id.clone(),
            project: request.project.clone(),
            commit_ref: request.commit_ref.clone(),
            node_count: graph.stats.total_nodes,
            edge_count: graph.stats.total_edges,
            created_at: now,
        };
        log.step(Destination::Registry, self.store().record_snapshot(&meta))
            .await?;
        drop(lease);

        // NOTIFY
        let event = BuildEvent {
            event: request.event_kind(),
            project: request.project.clone(),
            commit_ref: request.commit_ref.clone(),
            stats: graph.stats,
            diff,
            snapshot: Some(snapshot_id.clone()),
            updated_at: now,
        };
        if let Err(e) = self.notifier().notify(&event).await {
            tracing::warn!("Build notification for {} not delivered: {}", request.project, e);
        }

        tracing::info!(
            "Build finished: project {}, {} nodes, {} edges, {:?} index sync, snapshot {}",
            request.project,
            graph.stats.total_nodes,
            graph.stats.total_edges,
            sync.mode,
            snapshot_id
        );

        Ok(BuildReport {
            project: request.project.clone(),
            commit_ref: request.commit_ref.clone(),
            status: BuildStatus::Completed,
            nodes: graph.stats.total_nodes,
            edges: graph.stats.total_edges,
            index_sync: Some(sync.mode),
            snapshot: Some(snapshot_id),
            started_at,
            finished_at: Some(Utc::now()),
        })
    }

    /// Run a build and record its outcome as the latest report.
    pub async fn execute(&self, request: BuildRequest) -> BuildReport {
        let started_at = Utc::now();
        self.set_report(BuildReport::running(
            request.project.clone(),
            request.commit_ref.clone(),
            started_at,
        ))
        .await;

        let report = match self.run_build(&request, started_at).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Build failed: project {}: {}", request.project, e);
                let mut report =
                    BuildReport::running(request.project.clone(), request.commit_ref.clone(), started_at);
                report.status = e.to_status();
                report.finished_at = Some(Utc::now());
                report
            }
        };
        self.set_report(report.clone()).await;
        report
    }

    /// Start a build in the background and return at once. The outcome is
    /// only visible later through the read side and the last report.
    pub fn trigger(self: &Arc<Self>, request: BuildRequest) -> TriggerAck {
        let ack = TriggerAck {
            status: "started",
            project: request.project.clone(),
            commit_ref: request.commit_ref.clone(),
        };
        let context = Arc::clone(self);
        tokio::spawn(async move {
            context.execute(request).await;
        });
        ack
    }

    /// Build request for a project under the configured projects root.
    pub fn request_for(&self, project: Option<&str>) -> Result<BuildRequest, BuildError> {
        let project = project.unwrap_or(&self.config().engine.default_project);
        Ok(BuildRequest::new(project, self.project_root(project)?))
    }

    /// Re-read roadmap checklists and relate them to the current graph.
    /// Without a graph the tasks are stored with no relations.
    pub async fn sync_tasks(&self, project: &str) -> Result<TaskSync, BuildError> {
        let root = self.project_root(project)?;
        let sources = self.config().tasks.sources.clone();
        let tasks = tokio::task::spawn_blocking(move || collect_tasks(&root, &sources)).await?;

        let graph = self
            .store()
            .load_graph()
            .await
            .map_err(store_error(Phase::LoadPrevious))?
            .map(|cached| cached.graph)
            .unwrap_or_default();
        let sync = relate_tasks(tasks, &graph);
        self.store()
            .put_json(keys::TASKS, &sync)
            .await
            .map_err(store_error(Phase::Persist))?;

        tracing::info!(
            "Synced {} tasks, {} relations",
            sync.tasks.len(),
            sync.relations.len()
        );
        Ok(sync)
    }

    pub fn trigger_task_sync(self: &Arc<Self>, project: String) {
        let context = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = context.sync_tasks(&project).await {
                tracing::warn!("Task sync for {} failed: {}", project, e);
            }
        });
    }

    pub async fn load_tasks(&self) -> Result<TaskSync, StoreError> {
        Ok(self.store().get_json(keys::TASKS).await?.unwrap_or_default())
    }
}
