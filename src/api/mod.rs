//! HTTP API.
//!
//! Routes:
//! - `GET /` liveness banner
//! - `GET /health` status, uptime and corpus size
//! - `POST /analyze` classify a problem and list workers
//! - `POST /seed-workers` populate an empty directory
//! - `GET /metrics` Prometheus exposition

mod error;
mod handlers;

use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ApiError, ApiResult, ErrorDetail, ErrorResponse};
pub use handlers::{HealthResponse, RootResponse, SeedResponse, ROOT_MESSAGE};

use crate::config::ApiSection;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::metrics::MetricsService;

/// API server settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen_address: String,
    pub cors_enabled: bool,
    /// `*` allows any origin
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from(&ApiSection::default())
    }
}

impl From<&ApiSection> for ApiConfig {
    fn from(section: &ApiSection) -> Self {
        Self {
            listen_address: section.listen_address.clone(),
            cors_enabled: section.cors_enabled,
            cors_origins: section.cors_origins.clone(),
            request_timeout: Duration::from_secs(section.request_timeout_secs),
        }
    }
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<ServiceContext>,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(context: Arc<ServiceContext>, metrics: Arc<MetricsService>) -> Self {
        Self { context, metrics }
    }
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the router with its middleware stack.
pub fn router(state: AppState, config: &ApiConfig) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/seed-workers", post(handlers::seed_workers))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found);

    if config.cors_enabled {
        app = app.layer(cors_layer(config));
    }

    // Outermost first: requests are traced, then bounded by the timeout
    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout,
            )),
    )
    .with_state(state)
}

/// HTTP server bound to a [`ServiceContext`].
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn with_state(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run(self, addr: &str) -> Result<()> {
        let app = router(self.state, &self.config);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Api(format!("Failed to bind {}: {}", addr, e)))?;
        info!("API server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Api(format!("Server error: {}", e)))?;

        info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
