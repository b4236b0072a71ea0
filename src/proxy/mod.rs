//! Font proxy core.
//!
//! # Data Flow
//! ```text
//! HTTP layer builds IncomingRequest
//!     → classify.rs (stylesheet | static asset | rejection)
//!     → target.rs   (base URL + path + query)
//!     → safety.rs   (origin and prefix confinement)
//!     → pipeline.rs (cache lookup, upstream fetch, store)
//!     → rewrite.rs  (stylesheet URLs pointed back at the proxy)
//! ```

pub mod classify;
pub mod error;
pub mod pipeline;
pub mod rewrite;
pub mod safety;
pub mod target;

pub use classify::{Classifier, ClassifyError, ExtensionCase, RequestKind};
pub use error::ProxyError;
pub use pipeline::{FetchPipeline, IncomingRequest, ProxyResponse, ResponseSource, SetupError};
pub use target::{UpstreamBases, UpstreamTarget};
