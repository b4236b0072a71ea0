//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn pipeline results into HTTP responses
//! - Map pipeline errors to status codes with generic bodies
//!
//! # Design Decisions
//! - Rejections are 400 with a fixed message; the upstream URL is never echoed
//! - Upstream connection failures are 502, upstream timeouts 504

use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::proxy::{ProxyError, ProxyResponse};

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        if let Some(value) = self
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            headers.insert(header::CONTENT_TYPE, value);
        }
        headers.extend(self.headers);

        response
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.client_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ResponseSource;
    use axum::http::{HeaderMap, StatusCode};
    use bytes::Bytes;

    #[test]
    fn test_proxy_response_headers() {
        let mut extra = HeaderMap::new();
        extra.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));
        extra.insert(header::EXPIRES, HeaderValue::from_static("Thu, 01 Jan 2099 00:00:00 GMT"));

        let response = ProxyResponse {
            status: StatusCode::OK,
            body: Bytes::from_static(b"body{}"),
            content_type: Some("text/css; charset=utf-8".into()),
            headers: extra,
            source: ResponseSource::Fetched,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=86400");
        assert!(response.headers().contains_key(header::EXPIRES));
    }

    #[test]
    fn test_passthrough_without_content_type() {
        let response = ProxyResponse {
            status: StatusCode::NOT_FOUND,
            body: Bytes::new(),
            content_type: None,
            headers: HeaderMap::new(),
            source: ResponseSource::Passthrough,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.headers().contains_key(header::CONTENT_TYPE));
    }

    #[test]
    fn test_error_response() {
        let response = ProxyError::UnsafeTarget.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
