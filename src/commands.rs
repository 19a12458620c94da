//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use archgraph_engine::{BuildMode, BuildStatus, EngineConfig, EngineContext};
use archgraph_server::{ArchServer, ServerConfig};

fn open(config: Option<&Path>) -> anyhow::Result<EngineContext> {
    let config = EngineConfig::load(config).context("failed to load configuration")?;
    tracing::debug!("Projects root: {}", config.engine.projects_root.display());
    EngineContext::from_config(config).context("failed to open the graph store")
}

pub async fn serve(config: Option<&Path>, host: String, port: u16) -> anyhow::Result<()> {
    tracing::info!("archgraph v{}", env!("CARGO_PKG_VERSION"));
    let context = Arc::new(open(config)?);
    let server = ArchServer::new(context, ServerConfig { host, port });
    server.start().await
}

pub async fn build(
    config: Option<&Path>,
    project: Option<String>,
    commit: Option<String>,
    full: bool,
) -> anyhow::Result<()> {
    let context = open(config)?;
    let mode = if full { BuildMode::FullReindex } else { BuildMode::Auto };
    let request = context
        .request_for(project.as_deref())?
        .with_commit_ref(commit)
        .with_mode(mode);

    let report = context.execute(request).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    match report.status {
        BuildStatus::Completed => Ok(()),
        BuildStatus::Inconsistent { .. } => {
            bail!("build stopped part way through PERSIST; run it again to converge")
        }
        _ => bail!("build failed"),
    }
}

pub async fn snapshots(config: Option<&Path>, limit: usize) -> anyhow::Result<()> {
    let context = open(config)?;
    let items = context
        .store()
        .recent_snapshots(limit)
        .await
        .context("failed to read the snapshot registry")?;
    if items.is_empty() {
        println!("No snapshots recorded");
    }
    for meta in items {
        println!(
            "{}  {}  {} nodes  {} edges  {}",
            meta.created_at.format("%Y-%m-%d %H:%M:%S"),
            meta.project,
            meta.node_count,
            meta.edge_count,
            meta.id
        );
    }
    Ok(())
}

pub async fn diff(config: Option<&Path>) -> anyhow::Result<()> {
    let context = open(config)?;
    match context.store().load_diff().await.context("failed to read the diff")? {
        Some(diff) => println!("{}", serde_json::to_string_pretty(&diff)?),
        None => println!("No diff yet; it appears after the second build"),
    }
    Ok(())
}

pub async fn clear(config: Option<&Path>) -> anyhow::Result<()> {
    let context = open(config)?;
    tracing::info!("Clearing cached graph state");
    context.store().clear().await.context("failed to clear the store")?;
    tracing::info!("Cache cleared");
    Ok(())
}
