//! Engine configuration
//!
//! Loaded from `archgraph.toml` (or an explicit path), then overridden by
//! `ARCHGRAPH_*` environment variables. Every section is optional.
//!
//! ```toml
//! [engine]
//! projects_root = "/projects"
//! default_project = "staffprobot"
//! snapshot_dir = "data"
//!
//! [weights.roles]
//! owner = 1.0
//!
//! [notify]
//! url = "http://localhost:8001"
//! ```

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use archgraph_core::WeightOverrides;
use archgraph_indexer::ScanOptions;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "archgraph.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Project `name` lives at `projects_root/name`.
    pub projects_root: PathBuf,
    pub default_project: String,
    pub snapshot_dir: PathBuf,
    /// Cache files and the search index live here.
    pub cache_dir: PathBuf,
    pub history_capacity: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        EngineSection {
            projects_root: PathBuf::from("projects"),
            default_project: "default".to_string(),
            snapshot_dir: PathBuf::from("data"),
            cache_dir: PathBuf::from(".archgraph"),
            history_capacity: archgraph_core::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    /// Base URL of the receiving service. No URL, no notifications.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifySection {
    fn default() -> Self {
        NotifySection {
            url: None,
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseSection {
    pub ttl_secs: u64,
}

impl Default for LeaseSection {
    fn default() -> Self {
        LeaseSection { ttl_secs: 600 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksSection {
    /// Roadmap Markdown files, relative to the project root.
    pub sources: Vec<PathBuf>,
}

impl Default for TasksSection {
    fn default() -> Self {
        TasksSection {
            sources: vec![PathBuf::from("doc/plans/roadmap.md"), PathBuf::from("ROADMAP.md")],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub scan: ScanOptions,
    /// Initial weight overrides; runtime updates stored in the cache win.
    pub weights: WeightOverrides,
    pub notify: NotifySection,
    pub lease: LeaseSection,
    pub tasks: TasksSection,
}

impl EngineConfig {
    /// Read `path`, or `archgraph.toml` in the working directory when no
    /// path is given. Only an explicit path has to exist.
    pub fn from_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// File config plus `.env` and process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", env_file.display());
        }
        let mut config = Self::from_file(path)?;
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Override fields from `ARCHGRAPH_*` variables as returned by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("ARCHGRAPH_PROJECTS_ROOT") {
            self.engine.projects_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("ARCHGRAPH_DEFAULT_PROJECT") {
            self.engine.default_project = v;
        }
        if let Some(v) = lookup("ARCHGRAPH_SNAPSHOT_DIR") {
            self.engine.snapshot_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ARCHGRAPH_CACHE_DIR") {
            self.engine.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ARCHGRAPH_NOTIFY_URL") {
            self.notify.url = Some(v).filter(|url| !url.trim().is_empty());
        }
        if let Some(v) = lookup("ARCHGRAPH_LEASE_TTL_SECS") {
            self.lease.ttl_secs = v.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "ARCHGRAPH_LEASE_TTL_SECS".to_string(),
                value: v.clone(),
            })?;
        }
        Ok(())
    }

    /// `projects_root/project`. `None` unless `project` is a single plain
    /// directory name, so a request can never leave the projects root.
    pub fn project_root(&self, project: &str) -> Option<PathBuf> {
        let mut components = Path::new(project).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.engine.projects_root.join(project)),
            _ => None,
        }
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease.ttl_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify.timeout_secs)
    }

    /// File backing the local search index.
    pub fn index_path(&self) -> PathBuf {
        self.engine.cache_dir.join("search_index.json")
    }
}
