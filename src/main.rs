//! Archgraph CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "archgraph")]
#[command(about = "Function-level call graph of a Python codebase, kept current across builds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ./archgraph.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "7890")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Build the graph once and exit
    Build {
        /// Project directory name under the projects root
        #[arg(short, long)]
        project: Option<String>,

        /// Commit the build corresponds to; becomes the snapshot id
        #[arg(long)]
        commit: Option<String>,

        /// Rebuild the search index from scratch
        #[arg(long)]
        full: bool,
    },
    /// List recent snapshots
    Snapshots {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Print the latest diff
    Diff,
    /// Clear cached graph state and the search index
    Clear,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("archgraph={}", log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port, host } => commands::serve(config, host, port).await,
        Commands::Build {
            project,
            commit,
            full,
        } => commands::build(config, project, commit, full).await,
        Commands::Snapshots { limit } => commands::snapshots(config, limit).await,
        Commands::Diff => commands::diff(config).await,
        Commands::Clear => commands::clear(config).await,
        Commands::Version => {
            println!("archgraph v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
