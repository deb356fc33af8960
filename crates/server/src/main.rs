//! MedAssist server
//!
//! Main entry point for the medical question-answering web service.

use anyhow::Context;
use clap::Parser;
use medassist_core::{config::AppConfig, logging};
use medassist_knowledge::{AppContext, RagPipeline};
use medassist_server::{create_router, shutdown::shutdown_signal, AppState};

/// MedAssist - retrieval-augmented medical question answering
#[derive(Parser, Debug)]
#[command(name = "medassist")]
#[command(about = "Retrieval-augmented medical question answering over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, env = "MEDASSIST_BIND_ADDR")]
    bind: Option<String>,

    /// Passages retrieved per question
    #[arg(short = 'k', long, env = "MEDASSIST_TOP_K")]
    top_k: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Disable colored output (also honoured via NO_COLOR)
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets usually live in .env during development
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.bind,
        cli.top_k,
        cli.log_level,
        cli.log_json,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.log_json, config.no_color)?;

    tracing::info!("MedAssist v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = config.config_file {
        tracing::debug!("Config file: {:?}", path);
    }

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    let context = AppContext::from_config(&config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialise services");
        e
    })?;

    let state = AppState::new(RagPipeline::new(&context));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
