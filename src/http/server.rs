//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the single catch-all GET route
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to a plain TCP listener or a TLS listener
//! - Hand each request to the fetch pipeline and record metrics

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::CacheStore;
use crate::config::ProxyConfig;
use crate::http::request::{
    propagate_request_id_layer, request_id, set_request_id_layer, X_REQUEST_ID,
};
use crate::observability::metrics;
use crate::proxy::{FetchPipeline, IncomingRequest, SetupError};

/// How long in-flight TLS connections get to finish after shutdown is signalled.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FetchPipeline>,
}

/// HTTP server for the font proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and cache store.
    pub fn new(config: ProxyConfig, store: Arc<dyn CacheStore>) -> Result<Self, SetupError> {
        let pipeline = Arc::new(FetchPipeline::new(&config, store)?);
        let router = Self::build_router(&config, AppState { pipeline });
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        });

        Router::new()
            .route("/{*path}", get(proxy_handler))
            .route("/", get(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(trace)
            .layer(set_request_id_layer())
    }

    /// The configured router, for serving with a custom transport.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr` until shutdown.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Catch-all handler: every GET goes through the fetch pipeline.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, _body) = request.into_parts();
    let incoming = IncomingRequest::from_parts(&parts);

    tracing::debug!(
        request_id = %request_id(&parts),
        path = %incoming.path,
        query = %incoming.query,
        "Proxying request"
    );

    match state.pipeline.handle(&incoming).await {
        Ok(response) => {
            metrics::record_request(response.status.as_u16(), response.source.as_str(), start_time);
            response.into_response()
        }
        Err(e) => {
            let status = e.status();
            tracing::warn!(
                request_id = %request_id(&parts),
                path = %incoming.path,
                status = %status,
                error = %e,
                "Request failed"
            );
            metrics::record_request(status.as_u16(), "rejected", start_time);
            e.into_response()
        }
    }
}
