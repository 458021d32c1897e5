// crates/server/src/main.rs
//! Playbook runner server binary.

use anyhow::{Context, Result};
use clap::Parser;
use playbook_runner_observability::init_tracing;
use playbook_runner_server::{create_app, init_metrics, AppState, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "playbook-runner", version, about = "Run Ansible playbooks and stream their output")]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ServerConfig::from_env().context("loading configuration")?;
    let _log_guard = init_tracing(&config.log)?;
    init_metrics();

    let automation = config.automation;
    tokio::fs::create_dir_all(&automation.inventory_dir)
        .await
        .with_context(|| format!("creating inventory directory {}", automation.inventory_dir.display()))?;
    tracing::info!(settings = ?automation, "Loaded configuration");

    let app = create_app(AppState::new(automation));

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("binding {}:{}", cli.host, cli.port))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "Playbook runner listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
