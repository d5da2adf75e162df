//! Security response headers.
//!
//! Applied to every response as the last pipeline step, after any
//! conditional-GET rewrite, so nothing downstream can drop them.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::http::request::{RequestContext, X_REQUEST_ID};

pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");
pub const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-resource-policy");

/// Default when no earlier step chose a caching policy.
pub const NO_STORE: HeaderValue = HeaderValue::from_static("no-store");

/// Fixed hardening set plus the correlation id.
///
/// `Cache-Control` is only filled in when absent; a value set by the handler
/// or the ETag layer wins.
pub fn apply_security_headers(headers: &mut HeaderMap, ctx: &RequestContext) {
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        PERMISSIONS_POLICY,
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );
    headers.insert(CROSS_ORIGIN_RESOURCE_POLICY, HeaderValue::from_static("same-site"));
    headers.insert(X_REQUEST_ID, ctx.header_value());

    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, NO_STORE);
    }
}
