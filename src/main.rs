//! Font Proxy
//!
//! A caching reverse proxy for a web font provider, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                   FONT PROXY                      │
//!                         │                                                   │
//!   GET /css2?family=..   │  ┌─────────┐   ┌──────────┐   ┌──────────────┐  │
//!   GET /s/...woff2  ─────┼─▶│  http   │──▶│ classify │──▶│ target+safety│  │
//!                         │  │ server  │   └──────────┘   └──────┬───────┘  │
//!                         │  └─────────┘                         │          │
//!                         │       ▲                              ▼          │
//!                         │       │        ┌──────────┐   ┌──────────────┐  │
//!   ◀─────────────────────┼───────┴────────│ rewrite  │◀──│ cache / fetch│◀─┼── fonts API /
//!                         │                └──────────┘   └──────────────┘  │   static host
//!                         │                                                   │
//!                         │  config · observability · lifecycle · net/tls     │
//!                         └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use font_proxy::config::{load_config, ProxyConfig};
use font_proxy::lifecycle::{startup, Shutdown};
use font_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "font-proxy", version)]
#[command(about = "Caching reverse proxy for web fonts", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address (e.g. 127.0.0.1:8080).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("font-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    startup::run(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
