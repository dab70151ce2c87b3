//! # strand-server
//!
//! Server binary — wires settings, the model gateway, the tool registry,
//! and the session coordinator into the HTTP surface.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use strand_llm::openai::{OpenAiConfig, OpenAiGateway};
use strand_runtime::{EventEmitter, SessionCoordinator};
use strand_server::settings::SETTINGS_TTL;
use strand_server::{routes, AppState, SettingsHandle};
use strand_tools::providers::ProcessSandbox;
use strand_tools::sandbox::RunCodeTool;
use strand_tools::{SelfCorrectingTool, Tool, ToolRegistry};

/// Strand session server.
#[derive(Parser, Debug)]
#[command(name = "strand-server", about = "LLM session server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (overrides settings if specified).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the JSON settings file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Built-in tool registry: sandboxed code execution behind the
/// self-correcting retry wrapper.
fn create_tool_registry() -> Result<ToolRegistry> {
    let run_code: Arc<dyn Tool> = Arc::new(RunCodeTool::new(Arc::new(ProcessSandbox::new())));
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(SelfCorrectingTool::new(run_code)))
        .context("failed to register run_code tool")?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let metrics_handle = strand_server::metrics::install_recorder()?;

    let settings = SettingsHandle::load(args.settings, SETTINGS_TTL);
    let snapshot = settings.current();
    if snapshot.provider.api_key.is_empty() {
        warn!("no provider API key configured (STRAND_API_KEY) — model calls will fail");
    }

    let mut provider_config = OpenAiConfig::new(snapshot.provider.api_key.clone());
    provider_config.base_url = snapshot.provider.base_url.clone();
    provider_config.model = snapshot.provider.model.clone();
    let gateway = Arc::new(OpenAiGateway::new(provider_config)?);

    let registry = Arc::new(create_tool_registry()?);
    info!(tools = ?registry.names(), "tool registry created");

    let emitter = Arc::new(EventEmitter::new());
    let coordinator = Arc::new(SessionCoordinator::new(
        emitter,
        snapshot.server.max_concurrent_runs,
    ));

    let state = Arc::new(AppState {
        coordinator: Arc::clone(&coordinator),
        registry,
        gateway,
        settings,
        metrics: metrics_handle,
    });
    let app = routes::router(state);

    let port = args.port.unwrap_or(snapshot.server.port);
    let addr = format!("{}:{port}", args.host);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down, cancelling active runs");
    coordinator.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for ctrl-c");
    }
}
