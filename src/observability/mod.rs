//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and handlers produce:
//!     → logging.rs (structured events inside a per-request span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is a span field, so every event in a request carries it
//! - Metrics are cheap no-ops when no exporter is installed

pub mod logging;
pub mod metrics;
