//! Request handling and transformation.
//!
//! # Responsibilities
//! - Attach a unique request ID (UUID v4) and echo it on the response
//! - Extract what the pipeline needs (path, query, headers, host)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Host comes from the `Host` header, falling back to the URI authority (HTTP/2)

use axum::http::{header, request::Parts, HeaderName};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::proxy::IncomingRequest;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning an `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer copying the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Request ID of a request, or "unknown".
pub fn request_id(parts: &Parts) -> &str {
    parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Externally visible host the client addressed.
pub fn request_host(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_owned()))
}

impl IncomingRequest {
    /// Build from the head of an inbound HTTP request.
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            headers: parts.headers.clone(),
            host: request_host(parts),
        }
    }
}
