//! Conditional-GET support with content-hash ETags.
//!
//! Only buffered bodies are supported: the whole body is read to compute the
//! fingerprint before anything is forwarded. Streaming responses on cacheable
//! paths are buffered up to `max_buffered_bytes` and fail past that.

use axum::body::{self, Body};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::http::error::ApiError;

/// Set alongside every ETag: clients must revalidate but may reuse on match.
pub const NO_CACHE: HeaderValue = HeaderValue::from_static("no-cache");

/// Quoted hex SHA-256 of `body`, ready for the `ETag` header.
pub fn fingerprint(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    format!("\"{}\"", hex::encode(digest))
}

#[derive(Debug, Clone)]
pub struct ConditionalGet {
    prefixes: Vec<String>,
    max_buffered_bytes: usize,
}

impl ConditionalGet {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            prefixes: config.cacheable_prefixes.clone(),
            max_buffered_bytes: config.max_buffered_bytes,
        }
    }

    /// Whether a request/response pair qualifies for validation.
    pub fn applies(&self, method: &Method, path: &str, status: StatusCode) -> bool {
        *method == Method::GET
            && status == StatusCode::OK
            && self.prefixes.iter().any(|p| under_prefix(path, p))
    }

    /// Attach an ETag, or collapse the response to 304 when the client's
    /// `If-None-Match` matches it exactly.
    pub async fn apply(
        &self,
        request_headers: &HeaderMap,
        response: Response,
    ) -> Result<Response, ApiError> {
        let (mut parts, body) = response.into_parts();
        let bytes = body::to_bytes(body, self.max_buffered_bytes)
            .await
            .map_err(ApiError::internal)?;

        let etag = fingerprint(&bytes);
        let etag_value = HeaderValue::from_str(&etag).map_err(ApiError::internal)?;

        let matched = request_headers
            .get(header::IF_NONE_MATCH)
            .is_some_and(|v| v.as_bytes() == etag.as_bytes());

        parts.headers.insert(header::ETAG, etag_value);
        parts.headers.insert(header::CACHE_CONTROL, NO_CACHE);

        if matched {
            parts.status = StatusCode::NOT_MODIFIED;
            parts.headers.remove(header::CONTENT_LENGTH);
            parts.headers.remove(header::CONTENT_TYPE);
            return Ok(Response::from_parts(parts, Body::empty()));
        }

        Ok(Response::from_parts(parts, Body::from(bytes)))
    }
}

/// Segment-aware prefix match: `/events` covers `/events` and `/events/7`,
/// not `/eventsfeed`.
fn under_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}
