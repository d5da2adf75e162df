//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, transport limits)
//!     → pipeline.rs (rate check, handler, error translation, cache, headers)
//!         → request.rs (per-request context, client key)
//!         → error.rs (error kinds and their wire bodies)
//!         → cache.rs (ETag / If-None-Match)
//!     → Send to client
//! ```

pub mod cache;
pub mod error;
pub mod pipeline;
pub mod request;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use pipeline::Pipeline;
pub use request::{RequestContext, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
