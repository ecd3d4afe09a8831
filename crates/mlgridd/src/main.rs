//! mlgridd — the mlgrid coordinator daemon.
//!
//! Single binary that assembles the coordinator:
//! - One supervised engine per configured endpoint
//! - Orchestrator (booking, dispatch, request ledger)
//! - REST API
//!
//! # Usage
//!
//! ```text
//! mlgridd --config /etc/mlgrid/mlgrid.toml --port 8080
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use mlgrid_core::CoordinatorConfig;
use mlgrid_engine::{Engine, PythonLauncher};
use mlgrid_orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "mlgridd", about = "mlgrid coordinator daemon")]
struct Cli {
    /// Path to the mlgrid.toml configuration file.
    #[arg(long, default_value = "mlgrid.toml")]
    config: PathBuf,

    /// Override the REST listen port from the configuration file.
    #[arg(long)]
    port: Option<u16>,

    /// Override the engine executable directory.
    #[arg(long)]
    engine_path: Option<PathBuf>,

    /// Override the engine log directory.
    #[arg(long)]
    logs_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mlgridd=debug,mlgrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = CoordinatorConfig::from_file(&cli.config)?;
    if let Some(port) = cli.port {
        config.listen_port = port;
    }
    if let Some(engine_path) = cli.engine_path {
        config.engine_path = engine_path;
    }
    if let Some(logs_path) = cli.logs_path {
        config.logs_path = logs_path;
    }

    run(config).await
}

async fn run(config: CoordinatorConfig) -> anyhow::Result<()> {
    info!(engines = config.engines.len(), "mlgrid coordinator starting");

    std::fs::create_dir_all(&config.logs_path)?;

    // ── Assemble the engine pool ───────────────────────────────

    let launcher = Arc::new(PythonLauncher);
    let engines: Vec<Arc<Engine>> = config
        .engines
        .iter()
        .map(|endpoint| {
            Engine::new(
                endpoint.clone(),
                launcher.clone(),
                config.logs_path.clone(),
                config.engine_path.clone(),
                config.startup_timeout(),
            )
        })
        .collect();

    let orchestrator = Arc::new(Orchestrator::new(engines));
    info!("orchestrator initialized");

    // Engines launch before the API accepts traffic; any that fail to come
    // up stay off and drop out of booking until they recover.
    orchestrator.launch_engines().await;

    // ── Start API server ───────────────────────────────────────

    let router = mlgrid_api::build_router(Arc::clone(&orchestrator));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C; supervised engine processes die with
    // the daemon since they are child processes.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
    });

    server.await?;

    info!("mlgrid coordinator stopped");
    Ok(())
}
