//! Append-only JSON snapshot artifacts

use std::path::{Path, PathBuf};

use archgraph_core::GraphData;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use crate::StoreError;

pub const SNAPSHOT_PREFIX: &str = "architecture_";

/// Writes one immutable `{nodes, edges, stats}` file per build.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotWriter { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `graph` as `architecture_YYYYMMDD_HHMMSS.json`. An existing
    /// file is never replaced: a `_1`, `_2`, ... suffix is added instead.
    pub async fn write(&self, graph: &GraphData, at: DateTime<Utc>) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(graph)?;
        let stem = format!("{}{}", SNAPSHOT_PREFIX, at.format("%Y%m%d_%H%M%S"));

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}.json", stem)
            } else {
                format!("{}_{}.json", stem, attempt)
            };
            let path = self.dir.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&body).await?;
                    file.flush().await?;
                    tracing::info!("Snapshot written: {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Snapshot files in the directory, oldest first.
    pub async fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json") {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    pub async fn read(path: &Path) -> Result<GraphData, StoreError> {
        let content = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&content)?)
    }
}
