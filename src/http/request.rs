//! Per-request context.
//!
//! One [`RequestContext`] is created when a request enters the pipeline. It
//! is stored in the request extensions for handlers, stamped on the response
//! as `X-Request-ID`, and dropped when the response leaves.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, HeaderValue, Request};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation id plus start time.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    started: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn header_value(&self) -> HeaderValue {
        // A hyphenated UUID is always a valid header value.
        HeaderValue::from_str(&self.id.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("invalid"))
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Client identifier used as the rate-limit key.
///
/// Falls back to `"unknown"` when the server was not started with connect
/// info (e.g. when the router is driven directly in tests).
pub fn client_key<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
