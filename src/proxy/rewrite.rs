//! Stylesheet URL rewriting.
//!
//! Plain substring replacement of the upstream base URLs, no CSS parsing.
//! Output must stay byte-for-byte what a naive `replace` produces.

use bytes::Bytes;

/// Replace every occurrence of each base URL in `body` with `https://{host}`.
///
/// Non UTF-8 input is decoded lossily.
pub fn rewrite_stylesheet(body: &[u8], bases: &[&str], host: &str) -> Bytes {
    let replacement = format!("https://{}", host);
    let mut css = String::from_utf8_lossy(body).into_owned();
    for base in bases {
        if !base.is_empty() {
            css = css.replace(base, &replacement);
        }
    }
    Bytes::from(css)
}
