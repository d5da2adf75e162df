//! Request pipeline orchestrator.
//!
//! # Stages
//! ```text
//! START
//!   → RATE_CHECK ──rejected──────────────────────────────┐
//!   → HANDLING ──error signal / panic────────────────────┤
//!   → CACHE_CHECK (GET + 200 + cacheable path) or skip   │
//!   → HEADER_INJECT ◀────────────────────────────────────┘
//!   → LOGGED
//! ```
//!
//! One [`RequestContext`] is created per request and flows through every
//! stage. The limiter is touched only before the handler runs; no lock is
//! held while the handler executes.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::http::cache::ConditionalGet;
use crate::http::error::{translate, ApiError, ErrorKind, ErrorSignal};
use crate::http::request::{client_key, RequestContext};
use crate::observability::metrics;
use crate::security::headers::apply_security_headers;
use crate::security::rate_limit::{Decision, RateLimiter};

/// Shared pipeline components, injected into the router as middleware state.
#[derive(Debug, Clone)]
pub struct Pipeline {
    limiter: Arc<RateLimiter>,
    cache: ConditionalGet,
}

impl Pipeline {
    pub fn new(limiter: Arc<RateLimiter>, cache: ConditionalGet) -> Self {
        Self { limiter, cache }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            ConditionalGet::from_config(&config.cache),
        )
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    async fn process(&self, ctx: &RequestContext, mut request: Request, next: Next) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        // RATE_CHECK
        if let Decision::Rejected(tier) = self.limiter.check(&client_key(&request), &path) {
            tracing::info!(tier = tier.as_str(), "Rate limit exceeded");
            metrics::record_rate_limited(tier.as_str());
            return translate(&ApiError::RateLimited.signal(), ctx).into_response();
        }

        // HANDLING
        let request_headers = conditional_headers(request.headers());
        request.extensions_mut().insert(ctx.clone());

        let mut response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                tracing::error!(panic = %panic_message(&*panic), "Handler panicked");
                return translate(&ErrorSignal::new(ErrorKind::Internal), ctx).into_response();
            }
        };

        if let Some(signal) = response.extensions_mut().remove::<ErrorSignal>() {
            return translate(&signal, ctx).into_response();
        }

        // CACHE_CHECK
        if self.cache.applies(&method, &path, response.status()) {
            response = match self.cache.apply(&request_headers, response).await {
                Ok(response) => {
                    if response.status() == StatusCode::NOT_MODIFIED {
                        metrics::record_not_modified();
                    }
                    response
                }
                Err(err) => {
                    tracing::error!(error = %err, "Failed to buffer cacheable response");
                    translate(&err.signal(), ctx).into_response()
                }
            };
        }

        response
    }
}

/// Entry point wired with `axum::middleware::from_fn_with_state`.
pub async fn request_pipeline(
    State(pipeline): State<Pipeline>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::new();
    let method: Method = request.method().clone();
    let path = request.uri().path().to_owned();
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.id(),
        method = %method,
        path = %path,
    );

    async move {
        let mut response = pipeline.process(&ctx, request, next).await;

        // HEADER_INJECT
        apply_security_headers(response.headers_mut(), &ctx);

        // LOGGED
        let status = response.status().as_u16();
        let elapsed = ctx.elapsed();
        tracing::info!(
            request_id = %ctx.id(),
            method = %method,
            path = %path,
            status,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Request completed"
        );
        metrics::record_request(method.as_str(), status, elapsed);

        response
    }
    .instrument(span)
    .await
}

/// The only request header the cache stage needs after the request is moved.
fn conditional_headers(headers: &HeaderMap) -> HeaderMap {
    let mut kept = HeaderMap::new();
    if let Some(value) = headers.get(header::IF_NONE_MATCH) {
        kept.insert(header::IF_NONE_MATCH, value.clone());
    }
    kept
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
