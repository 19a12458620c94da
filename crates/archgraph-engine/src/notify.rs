//! Build completion notifications

use std::time::Duration;

use archgraph_core::{GraphDiff, GraphStats};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Path appended to the configured base URL.
pub const NOTIFY_PATH: &str = "/api/admin/devops/brain/update";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ReindexComplete,
    AnalyzeComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildEvent {
    pub event: EventKind,
    pub project: String,
    pub commit_ref: Option<String>,
    pub stats: GraphStats,
    pub diff: Option<GraphDiff>,
    pub snapshot: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("receiver answered {0}")]
    Status(reqwest::StatusCode),
}

/// Receives build events. Delivery failures are returned, never retried;
/// the caller decides what to do with them.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &BuildEvent) -> Result<(), NotifyError>;
}

/// POSTs events as JSON.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), NOTIFY_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl NotificationSink for HttpNotifier {
    async fn notify(&self, event: &BuildEvent) -> Result<(), NotifyError> {
        let response = self.client.post(&self.endpoint).json(event).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }
        tracing::debug!("Notified {} ({:?})", self.endpoint, event.event);
        Ok(())
    }
}

/// Used when no receiver is configured.
pub struct NoopNotifier;

#[async_trait::async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, _event: &BuildEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}
