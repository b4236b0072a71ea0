//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Open the cache store (purging expired entries)
//! - Build the pipeline and server
//! - Bind the plain or TLS listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::{self, CacheError};
use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::tls;
use crate::observability::metrics;
use crate::proxy::SetupError;

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("failed to open cache: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

/// Bring the proxy up and serve until `shutdown` fires.
pub async fn run(config: ProxyConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr = parse_addr("metrics address", &config.observability.metrics_address)?;
        metrics::init_metrics(addr);
    }

    let store = cache::open_store(&config.cache)?;

    let bind_address = config.listener.bind_address.clone();
    let tls_config = config.listener.tls.clone();

    tracing::info!(
        bind_address = %bind_address,
        api_base_url = %config.upstream.api_base_url,
        static_base_url = %config.upstream.static_base_url,
        fetch_ttl_secs = config.cache.fetch_ttl_secs,
        tls = tls_config.is_some(),
        "Configuration loaded"
    );

    let server = HttpServer::new(config, store)?;

    match tls_config {
        Some(tls_config) => {
            let rustls = tls::load_from_config(&tls_config).await?;
            let addr = parse_addr("bind address", &bind_address)?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addr() {
        assert!(parse_addr("bind address", "127.0.0.1:8080").is_ok());
        let err = parse_addr("bind address", "localhost").unwrap_err();
        assert_eq!(err.to_string(), "invalid bind address 'localhost'");
    }
}
