//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, catch-all route)
//!     → request.rs (request ID, IncomingRequest extraction)
//!     → proxy pipeline (classify, validate, cache, fetch)
//!     → response.rs (status, content type, cache headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
