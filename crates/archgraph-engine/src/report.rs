//! Build outcome reporting

use archgraph_store::SyncMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build state machine phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    LoadPrevious,
    Parse,
    Diff,
    Persist,
    Notify,
    Done,
}

/// PERSIST destinations, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Diff,
    SearchIndex,
    Cache,
    Snapshot,
    Registry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BuildStatus {
    Running,
    Completed,
    /// Nothing was persisted.
    Failed { phase: Phase, error: String },
    /// PERSIST stopped part way; `persisted` were written, `failed` was not,
    /// later destinations were not attempted. Needs an external retry.
    Inconsistent {
        persisted: Vec<Destination>,
        failed: Destination,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub project: String,
    pub commit_ref: Option<String>,
    pub status: BuildStatus,
    pub nodes: usize,
    pub edges: usize,
    pub index_sync: Option<SyncMode>,
    pub snapshot: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BuildReport {
    pub fn running(project: impl Into<String>, commit_ref: Option<String>, started_at: DateTime<Utc>) -> Self {
        BuildReport {
            project: project.into(),
            commit_ref,
            status: BuildStatus::Running,
            nodes: 0,
            edges: 0,
            index_sync: None,
            snapshot: None,
            started_at,
            finished_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == BuildStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inconsistent_status_shape() {
        let status = BuildStatus::Inconsistent {
            persisted: vec![Destination::Diff, Destination::SearchIndex],
            failed: Destination::Cache,
            error: "store unavailable: redis down".into(),
        };
        insta::assert_json_snapshot!(status, @r#"
        {
          "state": "inconsistent",
          "persisted": [
            "diff",
            "search_index"
          ],
          "failed": "cache",
          "error": "store unavailable: redis down"
        }
        "#);
    }

    #[test]
    fn test_running_report() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let report = BuildReport::running("demo", None, at);
        assert_eq!(report.status, BuildStatus::Running);
        assert!(!report.is_completed());
        assert_eq!(report.finished_at, None);
    }
}
