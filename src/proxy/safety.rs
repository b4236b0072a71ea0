//! Upstream URL confinement.
//!
//! A constructed upstream URL is only fetched when it stays on the base URL's
//! origin and under its path prefix. Crafted paths (`//evil.com/x.ttf`,
//! `@evil.com`, dot segments) must never turn the proxy into an open relay.

use url::Url;

/// Returns true iff `target` has the same scheme, host and port as `base`
/// and its path starts with `base`'s path.
///
/// Unparseable input on either side is unsafe.
pub fn is_safe(base: &str, target: &str) -> bool {
    match (Url::parse(base), Url::parse(target)) {
        (Ok(base), Ok(target)) => is_confined(&base, &target),
        _ => false,
    }
}

/// Same check on already-parsed URLs.
pub fn is_confined(base: &Url, target: &Url) -> bool {
    base.scheme() == target.scheme()
        && base.host_str().is_some()
        && base.host_str() == target.host_str()
        && base.port_or_known_default() == target.port_or_known_default()
        && target.path().starts_with(base.path())
}
