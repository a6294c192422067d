//! fda-analyzer - Financial Document Analyzer service
//!
//! Accepts PDF uploads on `POST /analyze` and returns a consolidated report
//! produced by a sequential four-stage analysis pipeline backed by a hosted
//! language model.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use fda_analyzer::agents::{build_stages, AgentContext};
use fda_analyzer::config::{AnalyzerConfig, AnalyzerToml, CliOverrides, CONFIG_PATH_ENV, MODULE_NAME};
use fda_analyzer::document::PdfDocumentSource;
use fda_analyzer::intake::Intake;
use fda_analyzer::model::{HuggingFaceClient, ModelClient};
use fda_analyzer::pipeline::{ExecutionNormalizer, PipelineRunner};
use fda_analyzer::AppState;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "fda-analyzer")]
#[command(about = "Financial Document Analyzer API", long_about = None)]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Interface to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path =
        fda_common::config::locate_config_file(args.config.as_deref(), CONFIG_PATH_ENV, MODULE_NAME);
    let toml: AnalyzerToml = fda_common::config::load_toml_config(config_path.as_deref())?;

    fda_common::logging::init_tracing(&toml.logging, "fda_analyzer")?;

    info!("Starting {} v{}", MODULE_NAME, env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let config = AnalyzerConfig::resolve(
        toml,
        CliOverrides {
            host: args.host,
            port: args.port,
        },
    )?;
    config.prepare_upload_dir()?;
    info!("Upload directory: {}", config.upload_dir.display());

    let model = HuggingFaceClient::new(&config.provider).context("Failed to build model client")?;
    info!("Model: {}", model.model_id());

    let ctx = AgentContext::new(Arc::new(model), Arc::new(PdfDocumentSource), config.max_prompt_chars);
    let pipeline = PipelineRunner::new(build_stages(ctx), ExecutionNormalizer::new(config.stage_timeout))?;
    info!("Stage timeout: {}s", config.stage_timeout.as_secs());

    let intake = Intake::new(config.upload_dir.clone(), config.intake);
    let state = AppState::new(intake, pipeline, &config.default_query);
    let app = fda_analyzer::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
