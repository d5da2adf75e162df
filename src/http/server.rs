//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router with every API route
//! - Wrap it in the request pipeline and the transport limits
//! - Bind to a listener and serve until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::AuthService;
use crate::config::{AppConfig, DatasetConfig};
use crate::http::pipeline::{request_pipeline, Pipeline};
use crate::store::Store;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub auth: Arc<AuthService>,
    pub dataset: Arc<DatasetConfig>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(Store::new()),
            auth: Arc::new(AuthService::from_config(&config.auth)),
            dataset: Arc::new(config.dataset.clone()),
        }
    }
}

/// HTTP server for the event API.
pub struct HttpServer {
    router: Router,
    state: AppState,
    pipeline: Pipeline,
}

impl HttpServer {
    /// Create a server with fresh state and a pipeline built from `config`.
    pub fn new(config: AppConfig) -> Self {
        let pipeline = Pipeline::from_config(&config);
        Self::with_pipeline(config, pipeline)
    }

    /// Create a server around an existing pipeline, e.g. one whose limiter
    /// runs on a mock clock.
    pub fn with_pipeline(config: AppConfig, pipeline: Pipeline) -> Self {
        let state = AppState::from_config(&config);
        let router = Self::build_router(&config, state.clone(), pipeline.clone());
        Self {
            router,
            state,
            pipeline,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Timeout and body-limit rejections are produced inside the pipeline so
    /// they still receive the security headers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState, pipeline: Pipeline) -> Router {
        api::routes()
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(from_fn_with_state(pipeline, request_pipeline))
            .layer(TraceLayer::new_for_http())
    }

    /// A clone of the fully layered router, for driving requests in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown message arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
