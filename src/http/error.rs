//! Error taxonomy and translation to HTTP.
//!
//! Handlers return [`ApiError`]. Its `IntoResponse` impl does not render a
//! body; it logs the cause where needed and attaches an [`ErrorSignal`] to the
//! response. The pipeline owns the [`RequestContext`] and is the single place
//! that turns a signal into the client-visible reply via [`translate`].

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::http::request::RequestContext;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised by route handlers and the pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    /// Conflict whose message is shown as-is.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Too Many Requests")]
    RateLimited,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ApiError::Internal(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Duplicate(_) => ErrorKind::Duplicate,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::RateLimited => ErrorKind::RateLimited,
            ApiError::BadRequest(_) => ErrorKind::BadRequest,
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Strip the error down to what may reach a client.
    pub fn signal(&self) -> ErrorSignal {
        let subject = match self {
            ApiError::NotFound(s)
            | ApiError::Duplicate(s)
            | ApiError::Conflict(s)
            | ApiError::Unauthenticated(s)
            | ApiError::Forbidden(s)
            | ApiError::BadRequest(s)
            | ApiError::Validation(s) => Some(s.clone()),
            ApiError::RateLimited | ApiError::Internal(_) => None,
        };
        ErrorSignal {
            kind: self.kind(),
            subject,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            // Runs inside the request span, so the correlation id is attached.
            tracing::error!(error = %cause, "Unhandled fault in handler");
        }

        let signal = self.signal();
        let mut response = signal.kind.status().into_response();
        response.extensions_mut().insert(signal);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Error categories understood by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    Conflict,
    Unauthenticated,
    Forbidden,
    RateLimited,
    BadRequest,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Duplicate | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Client-safe error value carried in response extensions until translated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSignal {
    pub kind: ErrorKind,
    pub subject: Option<String>,
}

impl ErrorSignal {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            subject: None,
        }
    }
}

/// Status, JSON body and extra headers for an error reply.
#[derive(Debug)]
pub struct Translated {
    pub status: StatusCode,
    pub body: Value,
    pub headers: HeaderMap,
}

impl IntoResponse for Translated {
    fn into_response(self) -> Response {
        (self.status, self.headers, Json(self.body)).into_response()
    }
}

pub fn translate(signal: &ErrorSignal, ctx: &RequestContext) -> Translated {
    let subject = signal.subject.as_deref();
    let mut headers = HeaderMap::new();

    let body = match signal.kind {
        ErrorKind::NotFound => json!({ "detail": format!("{} not found", subject.unwrap_or("resource")) }),
        ErrorKind::Duplicate => {
            json!({ "detail": format!("{} already exists", subject.unwrap_or("resource")) })
        }
        ErrorKind::Conflict => json!({ "detail": subject.unwrap_or("Conflict") }),
        ErrorKind::Unauthenticated => {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            json!({ "detail": subject.unwrap_or("Not authenticated") })
        }
        ErrorKind::Forbidden => json!({ "detail": subject.unwrap_or("Forbidden") }),
        ErrorKind::BadRequest => json!({ "detail": subject.unwrap_or("Bad Request") }),
        ErrorKind::Validation => json!({ "detail": subject.unwrap_or("Unprocessable Entity") }),
        ErrorKind::RateLimited => json!({
            "detail": "Too Many Requests",
            "request_id": ctx.id().to_string(),
        }),
        ErrorKind::Internal => json!({
            "detail": "Internal Server Error",
            "request_id": ctx.id().to_string(),
        }),
    };

    Translated {
        status: signal.kind.status(),
        body,
        headers,
    }
}
