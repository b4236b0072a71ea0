//! Pipeline error taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

use crate::proxy::classify::ClassifyError;

/// Reasons a request ends without a proxied response.
///
/// Non-200 upstream responses are not errors; they are passed through.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Stylesheet request without its selector parameter.
    #[error("missing '{0}' parameter")]
    MissingParameter(&'static str),

    /// Path is neither the stylesheet endpoint nor a font file.
    #[error("unrecognized path")]
    UnrecognizedPath,

    /// Constructed upstream URL left the allowed origin or prefix.
    #[error("unsafe upstream URL")]
    UnsafeTarget,

    /// No Host to rewrite stylesheet URLs to.
    #[error("missing Host header")]
    MissingHost,

    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// Connection, DNS, TLS or body read failure.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),
}

impl ProxyError {
    /// Status code sent to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter(_)
            | ProxyError::UnrecognizedPath
            | ProxyError::UnsafeTarget
            | ProxyError::MissingHost => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Body sent to the client. Never includes the upstream URL.
    pub fn client_message(&self) -> String {
        match self {
            ProxyError::MissingParameter(name) => format!("Missing '{}' parameter", name),
            ProxyError::UnrecognizedPath => "Invalid font path".to_string(),
            ProxyError::UnsafeTarget => "Unsafe URL".to_string(),
            ProxyError::MissingHost => "Missing Host header".to_string(),
            ProxyError::UpstreamTimeout => "Upstream request timed out".to_string(),
            ProxyError::Upstream(_) => "Upstream request failed".to_string(),
        }
    }
}

impl From<ClassifyError> for ProxyError {
    fn from(e: ClassifyError) -> Self {
        match e {
            ClassifyError::MissingParameter(name) => ProxyError::MissingParameter(name),
            ClassifyError::UnrecognizedPath => ProxyError::UnrecognizedPath,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProxyError::UpstreamTimeout
        } else {
            ProxyError::Upstream(e)
        }
    }
}
