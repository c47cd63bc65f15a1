//! Wingo server binary
//!
//! Runs the round engine and the HTTP API in one process.

use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use wingo::{
    api::ApiServer,
    config::{ConfigLoader, StorageBackend},
    services::ServiceBuilder,
};

#[derive(Parser, Debug)]
#[command(name = "wingo")]
#[command(about = "Wingo round engine and betting API", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Database directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Keep all state in memory
    #[arg(long)]
    memory: bool,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long)]
    cors_origins: Option<String>,

    /// Seed the outcome generator for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wingo=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;

    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_directory = data_dir;
    }
    if args.memory {
        config.storage.backend = StorageBackend::Memory;
    }
    if let Some(origins) = args.cors_origins {
        config.api.allowed_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Some(seed) = args.seed {
        config.engine.outcome_seed = Some(seed);
    }
    loader.validate(&config)?;

    if let Some(path) = args.write_config {
        loader.save(&config, &path)?;
        info!("Configuration written to {}", path);
        return Ok(());
    }

    info!("Starting Wingo v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "   Round interval: {}ms, betting closes {}ms before the next round",
        config.engine.round_interval_ms, config.engine.betting_grace_ms
    );
    info!("   Storage: {:?}", config.storage.backend);

    let api_config = config.api.clone();
    let services = ServiceBuilder::new(config).build().await?;

    let engine = services.engine();
    let engine_task = tokio::spawn(Arc::clone(&engine).start());

    let server = ApiServer::new(api_config, &services);
    let served = server.run(shutdown_signal()).await;

    engine.stop();
    if let Err(e) = engine_task.await {
        error!("Round engine task ended abnormally: {}", e);
    }

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
