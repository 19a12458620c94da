//! Axum router setup for the architecture API

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use archgraph_engine::EngineContext;

use crate::handlers::*;

/// Create the axum router with all routes
pub fn create_router(context: Arc<EngineContext>) -> Router {
    let architecture = Router::new()
        // Read side
        .route("/graph", get(get_graph))
        .route("/node/:id", get(get_node))
        .route("/meta", get(get_meta))
        .route("/diff", get(get_diff))
        .route("/snapshots", get(get_snapshots))
        .route("/tasks", get(get_tasks))
        .route("/status", get(get_status))
        .route("/diagram", get(get_diagram))
        // Triggers
        .route("/reindex", post(post_reindex))
        .route("/analyze", post(post_analyze))
        .route("/weights", post(post_weights))
        .route("/tasks/sync", post(post_tasks_sync));

    Router::new()
        .nest("/api/architecture", architecture)
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(context)
}
