//! tunif CLI: bring up a tun interface with its routes until interrupted

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tunif::{Session, TunnelConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "tunif")]
#[command(about = "Create a tun interface and route prefixes into it")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG, then RUST_LOG_LEVEL (e.g. "debug"), then --verbose
    let fallback = if cli.verbose { "debug" } else { "info" };
    let default_level = std::env::var("RUST_LOG_LEVEL").unwrap_or_else(|_| fallback.to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).without_time())
        .try_init()
        .ok();

    run(&cli.config).await
}

/// Open a session from `config_path` and hold it until Ctrl-C.
async fn run(config_path: &str) -> Result<()> {
    info!("Loading configuration from: {}", config_path);

    let config = TunnelConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from: {config_path}"))?;

    let session = match Session::open(&config) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to open tunnel session: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "Interface {} is up ({} route(s) configured); press Ctrl-C to exit",
        session.name(),
        config.enabled_routes().count()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl-C")?;

    info!("Shutting down {}", session.name());
    if let Err(e) = session.close() {
        if e.is_fatal() {
            return Err(e.into());
        }
        warn!("Teardown incomplete: {}", e);
    }

    Ok(())
}
