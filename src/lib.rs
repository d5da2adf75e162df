//! Event management API: events, attendees and RSVPs behind a request
//! pipeline that rate limits, translates errors, serves conditional GETs and
//! hardens every response.

pub mod api;
pub mod auth;
pub mod config;
pub mod dataset;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod store;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
