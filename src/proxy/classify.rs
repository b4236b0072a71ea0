//! Request classification.
//!
//! # Responsibilities
//! - Decide whether a path is a stylesheet request or a static font file
//! - Require the `family` selector on stylesheet requests
//! - Reject everything else
//!
//! # Design Decisions
//! - Pure function of path and query string, no I/O
//! - The stylesheet prefix is checked first; a `css2...` path is never a static asset
//! - Extension case sensitivity is an explicit policy, not an accident

use thiserror::Error;
use url::form_urlencoded;

/// Path prefix of the dynamic stylesheet endpoint.
pub const STYLESHEET_PREFIX: &str = "css2";

/// Query parameter a stylesheet request must carry.
pub const FAMILY_PARAM: &str = "family";

/// Binary font file extensions served from the static host.
pub const FONT_EXTENSIONS: [&str; 5] = [".ttf", ".woff2", ".woff", ".eot", ".otf"];

/// Why a path could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("missing '{0}' parameter")]
    MissingParameter(&'static str),

    #[error("unrecognized path")]
    UnrecognizedPath,
}

/// What an inbound request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Dynamic CSS listing of font faces.
    Stylesheet,
    /// A literal font file.
    StaticAsset,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Stylesheet => "stylesheet",
            RequestKind::StaticAsset => "static",
        }
    }
}

/// How font file extensions are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionCase {
    /// `.woff2` only.
    #[default]
    Sensitive,
    /// `.woff2`, `.WOFF2`, `.Woff2`...
    Insensitive,
}

/// Classifies request paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    extension_case: ExtensionCase,
}

impl Classifier {
    pub fn new(extension_case: ExtensionCase) -> Self {
        Self { extension_case }
    }

    /// Classify a request.
    ///
    /// `path` is relative to the proxy root (no leading slash) and `query` is
    /// the raw query string without `?`.
    pub fn classify(&self, path: &str, query: &str) -> Result<RequestKind, ClassifyError> {
        if path.starts_with(STYLESHEET_PREFIX) {
            if !has_non_empty_param(query, FAMILY_PARAM) {
                return Err(ClassifyError::MissingParameter(FAMILY_PARAM));
            }
            return Ok(RequestKind::Stylesheet);
        }

        if self.is_font_file(path) {
            return Ok(RequestKind::StaticAsset);
        }

        Err(ClassifyError::UnrecognizedPath)
    }

    fn is_font_file(&self, path: &str) -> bool {
        FONT_EXTENSIONS.iter().any(|ext| match self.extension_case {
            ExtensionCase::Sensitive => path.ends_with(ext),
            ExtensionCase::Insensitive => ends_with_ignore_ascii_case(path, ext),
        })
    }
}

fn ends_with_ignore_ascii_case(haystack: &str, suffix: &str) -> bool {
    let (hay, suf) = (haystack.as_bytes(), suffix.as_bytes());
    hay.len() >= suf.len() && hay[hay.len() - suf.len()..].eq_ignore_ascii_case(suf)
}

fn has_non_empty_param(query: &str, name: &str) -> bool {
    form_urlencoded::parse(query.as_bytes()).any(|(key, value)| key == name && !value.is_empty())
}
