//! REST API handlers for the architecture graph
//!
//! Read handlers only look at what the last successful PERSIST left behind.
//! Trigger handlers answer at once; the build itself runs on a tokio task.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use archgraph_core::{MERMAID_EDGE_LIMIT, SnapshotMeta, WeightOverrides, mermaid};
use archgraph_engine::{BuildMode, BuildReport, EngineContext, TriggerAck};
use archgraph_indexer::TaskSync;
use archgraph_store::{CachedGraph, GraphMeta, NodeView};

use crate::ApiError;

type AppState = State<Arc<EngineContext>>;

pub const DEFAULT_SNAPSHOT_LIMIT: usize = 20;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Optional body of the build and task triggers.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerBody {
    pub project: Option<String>,
    #[serde(alias = "commit_sha")]
    pub commit_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotList {
    pub items: Vec<SnapshotMeta>,
}

#[derive(Debug, Serialize)]
pub struct DiagramResponse {
    pub mermaid: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WeightsResponse {
    pub status: &'static str,
    pub weights: WeightOverrides,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn require_graph(context: &EngineContext) -> Result<CachedGraph, ApiError> {
    context
        .store()
        .load_graph()
        .await?
        .ok_or(ApiError::NotFound("Graph not built yet"))
}

pub async fn get_graph(State(context): AppState) -> Result<Json<CachedGraph>, ApiError> {
    Ok(Json(require_graph(&context).await?))
}

pub async fn get_node(
    State(context): AppState,
    Path(id): Path<String>,
) -> Result<Json<NodeView>, ApiError> {
    context
        .store()
        .node_with_edges(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Node not found"))
}

pub async fn get_meta(State(context): AppState) -> Result<Json<GraphMeta>, ApiError> {
    Ok(Json(context.store().meta().await?))
}

/// Latest diff, or `{"status": "empty"}` before the second build.
pub async fn get_diff(State(context): AppState) -> Result<Json<Value>, ApiError> {
    let body = match context.store().load_diff().await? {
        Some(diff) => serde_json::to_value(diff).map_err(archgraph_store::StoreError::from)?,
        None => json!({ "status": "empty" }),
    };
    Ok(Json(body))
}

pub async fn get_snapshots(
    State(context): AppState,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<SnapshotList>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_SNAPSHOT_LIMIT);
    let items = context.store().recent_snapshots(limit).await?;
    Ok(Json(SnapshotList { items }))
}

pub async fn get_tasks(State(context): AppState) -> Result<Json<TaskSync>, ApiError> {
    Ok(Json(context.load_tasks().await?))
}

pub async fn get_status(State(context): AppState) -> Json<Option<BuildReport>> {
    Json(context.last_report().await)
}

pub async fn get_diagram(State(context): AppState) -> Result<Json<DiagramResponse>, ApiError> {
    let cached = require_graph(&context).await?;
    Ok(Json(DiagramResponse {
        mermaid: mermaid(&cached.graph.edges, MERMAID_EDGE_LIMIT),
        generated_at: Utc::now(),
    }))
}

/// Full rebuild of the search index.
pub async fn post_reindex(
    State(context): AppState,
    body: Option<Json<TriggerBody>>,
) -> Result<Json<TriggerAck>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let request = context
        .request_for(body.project.as_deref())?
        .with_commit_ref(body.commit_ref)
        .with_mode(BuildMode::FullReindex);
    Ok(Json(context.trigger(request)))
}

/// Incremental build when a previous graph exists.
pub async fn post_analyze(
    State(context): AppState,
    body: Option<Json<TriggerBody>>,
) -> Result<Json<TriggerAck>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let request = context
        .request_for(body.project.as_deref())?
        .with_commit_ref(body.commit_ref);
    Ok(Json(context.trigger(request)))
}

pub async fn post_weights(
    State(context): AppState,
    Json(update): Json<WeightOverrides>,
) -> Result<Json<WeightsResponse>, ApiError> {
    let weights = context.store().update_weights(&update).await?;
    tracing::info!(
        "Weight overrides updated: {} roles, {} subsystems",
        weights.roles.len(),
        weights.subsystems.len()
    );
    Ok(Json(WeightsResponse {
        status: "ok",
        weights,
    }))
}

pub async fn post_tasks_sync(
    State(context): AppState,
    body: Option<Json<TriggerBody>>,
) -> Result<Json<Value>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let project = body
        .project
        .unwrap_or_else(|| context.config().engine.default_project.clone());
    context.project_root(&project)?;
    context.trigger_task_sync(project.clone());
    Ok(Json(json!({ "status": "started", "project": project })))
}
