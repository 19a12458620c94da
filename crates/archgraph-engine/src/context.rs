//! Explicitly constructed engine context
//!
//! Everything a build or a request handler needs is owned here and passed
//! around behind an `Arc`; there are no process-wide singletons.

use std::path::PathBuf;
use std::sync::Arc;

use archgraph_store::{FsCache, GraphStore, LeaseTable, LocalIndex, StoreError};
use tokio::sync::RwLock;

use crate::config::EngineConfig;
use crate::notify::{HttpNotifier, NoopNotifier, NotificationSink, NotifyError};
use crate::pipeline::BuildError;
use crate::report::BuildReport;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("cannot open store: {0}")]
    Store(#[from] StoreError),
    #[error("cannot create notifier: {0}")]
    Notify(#[from] NotifyError),
}

pub struct EngineContext {
    config: EngineConfig,
    store: GraphStore,
    notifier: Arc<dyn NotificationSink>,
    leases: LeaseTable,
    last_report: RwLock<Option<BuildReport>>,
}

impl EngineContext {
    pub fn new(config: EngineConfig, store: GraphStore, notifier: Arc<dyn NotificationSink>) -> Self {
        let leases = LeaseTable::new(config.lease_ttl());
        EngineContext {
            config,
            store,
            notifier,
            leases,
            last_report: RwLock::new(None),
        }
    }

    /// File-backed cache and index under `cache_dir`, snapshots under
    /// `snapshot_dir`, HTTP notifications when a URL is configured.
    pub fn from_config(config: EngineConfig) -> Result<Self, SetupError> {
        let cache = Arc::new(FsCache::new(config.engine.cache_dir.join("cache")));
        let index = Arc::new(LocalIndex::open(config.index_path())?);
        let store = GraphStore::new(
            cache,
            index,
            config.engine.snapshot_dir.clone(),
            config.engine.history_capacity,
        );

        let notifier: Arc<dyn NotificationSink> = match &config.notify.url {
            Some(url) => {
                let notifier = HttpNotifier::new(url, config.notify_timeout())?;
                tracing::info!("Build notifications go to {}", notifier.endpoint());
                Arc::new(notifier)
            }
            None => Arc::new(NoopNotifier),
        };

        Ok(Self::new(config, store, notifier))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    pub fn leases(&self) -> &LeaseTable {
        &self.leases
    }

    /// Directory of `project` under the projects root.
    pub fn project_root(&self, project: &str) -> Result<PathBuf, BuildError> {
        self.config
            .project_root(project)
            .ok_or_else(|| BuildError::InvalidProject(project.to_string()))
    }

    pub async fn last_report(&self) -> Option<BuildReport> {
        self.last_report.read().await.clone()
    }

    pub(crate) async fn set_report(&self, report: BuildReport) {
        *self.last_report.write().await = Some(report);
    }
}
