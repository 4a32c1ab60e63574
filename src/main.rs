//! Repertoire - Recipe Diversity Engine
//!
//! Main entry point: serves the HTTP API, runs retention cleanup, and runs
//! batch analytics aggregation.

use clap::{Parser, Subcommand};
use repertoire_core::{
    api::{self, ApiServerConfig, AppState},
    AnalyticsAggregator, ConnectionMode, EngineConfig, GenerationOrchestrator, LibsqlStore,
    LlmRecipeGenerator, MemoryStore, RemoteEmbeddingService,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Get the default database path
fn get_default_db_path() -> PathBuf {
    PathBuf::from("repertoire.db")
}

/// Get the database path from CLI arg, env var, or default
fn get_db_path(cli_path: Option<String>) -> String {
    cli_path
        .or_else(|| std::env::var("REPERTOIRE_DB_PATH").ok())
        .unwrap_or_else(|| get_default_db_path().to_string_lossy().to_string())
}

#[derive(Parser)]
#[command(name = "repertoire")]
#[command(about = "Recipe diversity engine", long_about = None)]
struct Cli {
    /// Database path (overrides REPERTOIRE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },

    /// Delete recipes older than the retention window for one user
    Cleanup {
        #[arg(long)]
        user: String,

        #[arg(long, default_value_t = 90)]
        retention_days: i64,
    },

    /// Recompute diversity metrics for all users
    Aggregate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let db_path = get_db_path(cli.db.clone());

    let store: Arc<dyn MemoryStore> =
        Arc::new(LibsqlStore::new(ConnectionMode::Local(db_path.clone())).await?);

    match cli.command {
        Command::Serve { addr } => {
            let config = EngineConfig::default();
            config.validate()?;

            let generator = Arc::new(LlmRecipeGenerator::with_default()?);

            let embedding_key = std::env::var("EMBEDDING_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .unwrap_or_default();
            let embedder = Arc::new(RemoteEmbeddingService::new(embedding_key, None, None)?);

            let orchestrator = Arc::new(GenerationOrchestrator::new(
                Arc::clone(&store),
                generator,
                embedder,
                config,
            )?);
            let analytics = Arc::new(AnalyticsAggregator::new(Arc::clone(&store)));

            let state = AppState::new(orchestrator, store, analytics);
            api::serve(state, ApiServerConfig { addr }).await?;
        }

        Command::Cleanup {
            user,
            retention_days,
        } => {
            let deleted = store.cleanup_old_recipes(&user, retention_days).await?;
            info!(user = %user, retention_days, deleted, "Cleanup complete");
            println!("Deleted {} recipes for {}", deleted, user);
        }

        Command::Aggregate => {
            let analytics = AnalyticsAggregator::new(store);
            let report = analytics.aggregate_all_users().await?;
            println!(
                "Aggregated metrics: {} users processed, {} failed",
                report.processed, report.failed
            );
        }
    }

    Ok(())
}
