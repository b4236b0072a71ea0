//! Upstream URL construction.

use url::Url;

use crate::proxy::classify::RequestKind;

/// Where a classified request will be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Base URL selected by request kind, normalized to end in `/`.
    pub base_url: String,
    /// Base joined with path and query. Also the cache key.
    pub full_url: String,
}

/// The two upstream hosts the proxy serves from.
///
/// Bases are kept without trailing slashes, which is also the form
/// stylesheet rewriting searches for.
#[derive(Debug, Clone)]
pub struct UpstreamBases {
    api: String,
    static_assets: String,
}

impl UpstreamBases {
    pub fn new(api: impl Into<String>, static_assets: impl Into<String>) -> Self {
        Self {
            api: trim_base(api.into()),
            static_assets: trim_base(static_assets.into()),
        }
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn static_assets(&self) -> &str {
        &self.static_assets
    }

    pub fn for_kind(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::Stylesheet => &self.api,
            RequestKind::StaticAsset => &self.static_assets,
        }
    }

    /// Resolve `path` (relative, no leading slash) against the base for `kind`
    /// and append `query` verbatim.
    ///
    /// Resolution follows RFC 3986, so a path such as `//evil.com/a.ttf`
    /// yields a different host; callers must confine the result with
    /// [`crate::proxy::safety::is_safe`] before using it.
    pub fn build(&self, kind: RequestKind, path: &str, query: &str) -> Option<UpstreamTarget> {
        let mut base = Url::parse(self.for_kind(kind)).ok()?;
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }

        let mut url = base.join(path).ok()?;
        url.set_query((!query.is_empty()).then_some(query));

        Some(UpstreamTarget {
            base_url: base.to_string(),
            full_url: url.to_string(),
        })
    }
}

fn trim_base(mut base: String) -> String {
    let len = base.trim_end_matches('/').len();
    base.truncate(len);
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> UpstreamBases {
        UpstreamBases::new("https://fonts.googleapis.com", "https://fonts.gstatic.com")
    }

    #[test]
    fn test_stylesheet_target() {
        let target = google()
            .build(RequestKind::Stylesheet, "css2", "family=Roboto&display=swap")
            .unwrap();
        assert_eq!(target.base_url, "https://fonts.googleapis.com/");
        assert_eq!(
            target.full_url,
            "https://fonts.googleapis.com/css2?family=Roboto&display=swap"
        );
    }

    #[test]
    fn test_static_target_without_query() {
        let target = google()
            .build(RequestKind::StaticAsset, "s/roboto/v30/abc.woff2", "")
            .unwrap();
        assert_eq!(target.full_url, "https://fonts.gstatic.com/s/roboto/v30/abc.woff2");
    }

    #[test]
    fn test_base_with_path_prefix() {
        let bases =
            UpstreamBases::new("http://127.0.0.1:9000/api", "http://127.0.0.1:9000/static/");
        let target = bases.build(RequestKind::Stylesheet, "css2", "family=A").unwrap();
        assert_eq!(target.base_url, "http://127.0.0.1:9000/api/");
        assert_eq!(target.full_url, "http://127.0.0.1:9000/api/css2?family=A");

        // Dot segments cannot climb out of the base prefix unnoticed.
        let target = bases.build(RequestKind::Stylesheet, "../apix/css2", "").unwrap();
        assert!(!crate::proxy::safety::is_safe(&target.base_url, &target.full_url));

        let target = bases.build(RequestKind::StaticAsset, "a.ttf", "").unwrap();
        assert_eq!(target.full_url, "http://127.0.0.1:9000/static/a.ttf");
    }

    #[test]
    fn test_trailing_slash_bases_are_trimmed() {
        let bases =
            UpstreamBases::new("https://fonts.googleapis.com/", "https://fonts.gstatic.com//");
        assert_eq!(bases.api(), "https://fonts.googleapis.com");
        assert_eq!(bases.static_assets(), "https://fonts.gstatic.com");

        let target = bases.build(RequestKind::StaticAsset, "s/a.ttf", "").unwrap();
        assert_eq!(target.base_url, "https://fonts.gstatic.com/");
        assert_eq!(target.full_url, "https://fonts.gstatic.com/s/a.ttf");
    }

    #[test]
    fn test_network_path_escapes_host() {
        let target = google()
            .build(RequestKind::StaticAsset, "//evil.com/a.ttf", "")
            .unwrap();
        assert_eq!(target.full_url, "https://evil.com/a.ttf");
        assert!(!crate::proxy::safety::is_safe(&target.base_url, &target.full_url));
    }
}
