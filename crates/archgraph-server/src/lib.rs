//! HTTP surface for the architecture graph

pub mod error;
pub mod handlers;
pub mod router;


use std::sync::Arc;

use archgraph_engine::EngineContext;

pub use error::ApiError;
pub use router::create_router;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 7890,
        }
    }
}

pub struct ArchServer {
    context: Arc<EngineContext>,
    config: ServerConfig,
}

impl ArchServer {
    pub fn new(context: Arc<EngineContext>, config: ServerConfig) -> Self {
        ArchServer { context, config }
    }

    pub fn context(&self) -> Arc<EngineContext> {
        Arc::clone(&self.context)
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);

        let app = create_router(self.context);
        axum::serve(listener, app).await?;
        Ok(())
    }
}
