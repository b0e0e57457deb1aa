//! NVMe Frontend Bridge
//!
//! Serves the namespace control plane over REST and drives the storage
//! engine over JSON-RPC, or an in-process engine in standalone mode.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nvme_frontend_bridge::{
    ApiServer, ApiServerConfig, BridgeConfig, EngineFactory, NamespaceController,
    NamespaceRegistry, SubsystemCatalog,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// NVMe Frontend Bridge - namespace control plane for an SPDK-style engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8090")]
    api_addr: String,

    /// Engine address (socket path, unix:<path>, tcp://host:port); overrides the config file
    #[arg(long, env = "ENGINE_ADDR")]
    engine_addr: Option<String>,

    /// Engine call timeout in milliseconds; overrides the config file
    #[arg(long, env = "ENGINE_TIMEOUT_MS")]
    engine_timeout_ms: Option<u64>,

    /// YAML configuration file
    #[arg(long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Run against the in-process engine instead of a real one
    #[arg(long, env = "STANDALONE")]
    standalone: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    if let Some(address) = &args.engine_addr {
        config.engine.address = address.clone();
    }
    if let Some(timeout_ms) = args.engine_timeout_ms {
        config.engine.call_timeout_ms = timeout_ms;
    }

    info!("Starting NVMe Frontend Bridge");
    info!("  Version: {}", nvme_frontend_bridge::VERSION);
    info!("  REST API: {}", args.api_addr);
    info!("  Engine: {}", config.engine.address);
    info!("  Standalone mode: {}", args.standalone);

    let engine_kind = if args.standalone { "memory" } else { "jsonrpc" };
    let engine = EngineFactory::create(engine_kind, &config.engine)
        .context("creating engine gateway")?;

    match engine.health_check().await {
        Ok(true) => info!("Engine '{}' reachable", engine.engine_name()),
        Ok(false) => warn!("Engine '{}' not reachable yet", engine.engine_name()),
        Err(e) => warn!("Engine health check failed: {}", e),
    }

    let catalog = SubsystemCatalog::from_subsystems(config.subsystems.clone());
    info!("Subsystem catalog initialized ({} subsystems)", catalog.len());

    let registry = NamespaceRegistry::new();
    spawn_event_logger(&registry);

    let controller = NamespaceController::new(
        config.controller.clone(),
        engine,
        catalog,
        registry.clone(),
    )
    .context("creating namespace controller")?;

    let api_config = ApiServerConfig {
        rest_addr: args
            .api_addr
            .parse()
            .with_context(|| format!("invalid REST API address {}", args.api_addr))?,
    };
    let api_server = ApiServer::new(api_config, controller, registry);

    let shutdown = api_server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = shutdown.send(());
    });

    api_server.run().await.context("running API server")?;

    info!("Bridge shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("tower=warn".parse()?)
        .add_directive("tower_http=info".parse()?)
        .add_directive("axum=info".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

// =============================================================================
// Registry Events
// =============================================================================

fn spawn_event_logger(registry: &Arc<NamespaceRegistry>) {
    let mut events = registry.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!("Registry: {}", event),
                Err(RecvError::Lagged(missed)) => warn!("Registry event log skipped {}", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
