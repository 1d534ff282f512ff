//! mergelens server entry point.
//!
//! Loads configuration, initializes tracing, serves the HTTP API and shuts
//! down gracefully on SIGINT / SIGTERM.

mod signals;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mergelens_core::config::AppConfig;
use mergelens_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// mergelens HTTP server.
#[derive(Parser, Debug)]
#[command(
    name = "mergelens-server",
    version,
    about = "Serve three-way merge previews over HTTP"
)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override the listen address from the config file.
    #[arg(long)]
    listen: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load and resolve configuration
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path).context("failed to load configuration file")?,
        None => AppConfig::default(),
    };
    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }
    config.resolve_env_vars();
    config
        .validate()
        .context("configuration validation failed")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    info!("========================================");
    info!("  mergelens server v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    match &args.config {
        Some(path) => info!("Config file     : {}", path.display()),
        None => info!("Config file     : (defaults)"),
    }
    info!("Listen          : {}", config.server.listen);
    info!("GitHub API      : {}", config.github.api_url);
    info!(
        "GitHub token    : {}",
        if config.github.token.is_some() { "configured" } else { "missing" }
    );
    info!("Max files       : {}", config.merge.max_files);
    info!("Max concurrency : {}", config.merge.max_concurrency);
    info!("Log level       : {}", log_level);
    info!("========================================");

    let web_server = WebServer::new(&config).context("failed to initialize web server")?;
    web_server
        .start(signals::wait_for_shutdown())
        .await
        .context("web server error")?;

    info!("mergelens server stopped.");
    Ok(())
}
