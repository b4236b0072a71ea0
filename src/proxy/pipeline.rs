//! Cache-then-fetch pipeline.
//!
//! # Data Flow
//! ```text
//! IncomingRequest
//!     → classify (stylesheet | static asset)       → 400 on rejection
//!     → build upstream URL from base + path + query
//!     → confine URL to base origin/prefix          → 400 "Unsafe URL"
//!     → cache lookup                               → 200 on hit
//!     → upstream GET (headers forwarded, UA overridden)
//!     → 200: rewrite stylesheet, store, respond with cache headers
//!     → other: pass status/body/content type through, not stored
//! ```
//!
//! # Design Decisions
//! - Linear, no retries; one upstream call and one cache write at most
//! - Cache failures degrade to a miss / an unstored response
//! - Concurrent misses on the same key both fetch; the last write wins

use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    StatusCode,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::cache::{CacheStore, CachedAsset};
use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::proxy::classify::{Classifier, ExtensionCase, RequestKind};
use crate::proxy::error::ProxyError;
use crate::proxy::rewrite::rewrite_stylesheet;
use crate::proxy::safety;
use crate::proxy::target::{UpstreamBases, UpstreamTarget};

/// `Cache-Control` sent with every successful response.
pub const CACHE_CONTROL_VALUE: &str = "public, max-age=86400";

/// Content type stored when upstream sends none.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Inbound headers never forwarded upstream.
const SKIPPED_HEADERS: [&str; 12] = [
    "host",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "accept-encoding",
];

/// One inbound request, reduced to what the pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    /// URI path, leading slash included.
    pub path: String,
    /// Raw query string without `?`, empty if none.
    pub query: String,
    pub headers: HeaderMap,
    /// Externally visible host of the proxy (`Host` header).
    pub host: Option<String>,
}

/// Where a response body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    CacheHit,
    Fetched,
    /// Non-200 upstream answer relayed as-is.
    Passthrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::CacheHit => "hit",
            ResponseSource::Fetched => "miss",
            ResponseSource::Passthrough => "passthrough",
        }
    }
}

/// Response produced by the pipeline.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<String>,
    /// Extra headers besides `Content-Type`.
    pub headers: HeaderMap,
    pub source: ResponseSource,
}

impl ProxyResponse {
    /// A cache hit. The upstream `Expires` is not stored, so only `Cache-Control` is sent.
    fn cached(asset: CachedAsset) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
        Self {
            status: StatusCode::OK,
            body: asset.payload,
            content_type: Some(asset.content_type),
            headers,
            source: ResponseSource::CacheHit,
        }
    }
}

/// Failure to construct a pipeline from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid user agent: {0}")]
    UserAgent(#[from] header::InvalidHeaderValue),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Classifies, validates, serves from cache or fetches upstream.
pub struct FetchPipeline {
    classifier: Classifier,
    bases: UpstreamBases,
    store: Arc<dyn CacheStore>,
    client: reqwest::Client,
    user_agent: HeaderValue,
    fetch_ttl: Duration,
}

impl FetchPipeline {
    /// Create a pipeline from configuration and an already opened store.
    pub fn new(config: &ProxyConfig, store: Arc<dyn CacheStore>) -> Result<Self, SetupError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs));
        if let Some(secs) = config.timeouts.upstream_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let extension_case = if config.upstream.case_insensitive_extensions {
            ExtensionCase::Insensitive
        } else {
            ExtensionCase::Sensitive
        };

        Ok(Self {
            classifier: Classifier::new(extension_case),
            bases: UpstreamBases::new(
                config.upstream.api_base_url.clone(),
                config.upstream.static_base_url.clone(),
            ),
            store,
            client: builder.build()?,
            user_agent: HeaderValue::from_str(&config.upstream.user_agent)?,
            fetch_ttl: config.cache.fetch_ttl(),
        })
    }

    /// Run one request through the pipeline.
    pub async fn handle(&self, request: &IncomingRequest) -> Result<ProxyResponse, ProxyError> {
        let path = request.path.strip_prefix('/').unwrap_or(&request.path);

        let kind = match self.classifier.classify(path, &request.query) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(path = %request.path, reason = %e, "Rejected request");
                return Err(e.into());
            }
        };
        tracing::info!(path = %request.path, kind = kind.as_str(), "Classified request");

        let target = self.resolve(kind, path, &request.query)?;

        if let Some(asset) = self.lookup(&target.full_url).await {
            tracing::info!(path = %request.path, url = %target.full_url, "Cache hit");
            metrics::record_cache_lookup(true);
            return Ok(ProxyResponse::cached(asset));
        }
        tracing::info!(path = %request.path, url = %target.full_url, "Cache miss");
        metrics::record_cache_lookup(false);

        let host = match kind {
            RequestKind::Stylesheet => match request.host.as_deref() {
                Some(host) if !host.is_empty() => Some(host),
                _ => {
                    tracing::warn!(path = %request.path, "No Host to rewrite stylesheet to");
                    return Err(ProxyError::MissingHost);
                }
            },
            RequestKind::StaticAsset => None,
        };

        self.fetch(kind, &target, request, host).await
    }

    fn resolve(
        &self,
        kind: RequestKind,
        path: &str,
        query: &str,
    ) -> Result<UpstreamTarget, ProxyError> {
        match self.bases.build(kind, path, query) {
            Some(target) if safety::is_safe(&target.base_url, &target.full_url) => Ok(target),
            Some(target) => {
                tracing::warn!(path = %path, url = %target.full_url, "Unsafe URL detected");
                Err(ProxyError::UnsafeTarget)
            }
            None => {
                tracing::warn!(path = %path, "Could not build upstream URL");
                Err(ProxyError::UnsafeTarget)
            }
        }
    }

    async fn fetch(
        &self,
        kind: RequestKind,
        target: &UpstreamTarget,
        request: &IncomingRequest,
        host: Option<&str>,
    ) -> Result<ProxyResponse, ProxyError> {
        let start = Instant::now();
        let upstream_error = |e: reqwest::Error| {
            tracing::error!(
                path = %request.path,
                url = %target.full_url,
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream_error();
            ProxyError::from(e)
        };

        let response = self
            .client
            .get(&target.full_url)
            .headers(self.forward_headers(&request.headers))
            .send()
            .await
            .map_err(upstream_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let expires = response.headers().get(header::EXPIRES).cloned();
        let body = response.bytes().await.map_err(upstream_error)?;
        metrics::record_upstream_response(status.as_u16(), start);

        if status != StatusCode::OK {
            tracing::info!(path = %request.path, status = %status, "Passing through upstream");
            return Ok(ProxyResponse {
                status,
                body,
                content_type,
                headers: HeaderMap::new(),
                source: ResponseSource::Passthrough,
            });
        }

        let payload = match (kind, host) {
            (RequestKind::Stylesheet, Some(host)) => {
                rewrite_stylesheet(&body, &[self.bases.api(), self.bases.static_assets()], host)
            }
            _ => body,
        };
        let content_type = content_type.unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        self.store_asset(
            &target.full_url,
            CachedAsset {
                payload: payload.clone(),
                content_type: content_type.clone(),
            },
        )
        .await;

        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
        if let Some(expires) = expires {
            headers.insert(header::EXPIRES, expires);
        }

        Ok(ProxyResponse {
            status,
            body: payload,
            content_type: Some(content_type),
            headers,
            source: ResponseSource::Fetched,
        })
    }

    /// Inbound headers minus Host and hop-by-hop ones, with our User-Agent.
    fn forward_headers(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(inbound.len() + 1);
        for (name, value) in inbound {
            if !is_skipped(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        headers.insert(header::USER_AGENT, self.user_agent.clone());
        headers
    }

    async fn lookup(&self, key: &str) -> Option<CachedAsset> {
        let store = self.store.clone();
        let owned_key = key.to_string();
        match tokio::task::spawn_blocking(move || store.get(&owned_key)).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                tracing::warn!(url = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "Cache read task failed");
                None
            }
        }
    }

    async fn store_asset(&self, key: &str, asset: CachedAsset) {
        let store = self.store.clone();
        let owned_key = key.to_string();
        let ttl = self.fetch_ttl;
        match tokio::task::spawn_blocking(move || store.set(&owned_key, asset, Some(ttl))).await {
            Ok(Ok(())) => {
                tracing::info!(url = %key, ttl_secs = ttl.as_secs(), "Cached response");
            }
            Ok(Err(e)) => tracing::warn!(url = %key, error = %e, "Cache write failed"),
            Err(e) => tracing::warn!(url = %key, error = %e, "Cache write task failed"),
        }
    }
}

fn is_skipped(name: &HeaderName) -> bool {
    *name == header::USER_AGENT || SKIPPED_HEADERS.contains(&name.as_str())
}
