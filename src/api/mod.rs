//! HTTP API server for the chat relay

mod auth;
pub mod chat;
mod error;
pub mod models;
pub mod status;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, UPSTREAM_DETAIL};

use crate::backend::Backend;
use crate::config::{Config, DEFAULT_AUTH_TOKEN};
use crate::hardware::HardwareMonitor;
use crate::registry::ModelRegistry;
use crate::relay::ChatRelay;
use crate::Result;

/// Shared state for API handlers
pub struct ApiState {
    pub relay: ChatRelay,
    pub auth_token: String,
    pub hardware: Arc<HardwareMonitor>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    registry: Arc<ModelRegistry>,
    backend: Arc<dyn Backend>,
    auth_token: String,
    hardware: Option<Arc<HardwareMonitor>>,
    bind_addr: String,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>, backend: Arc<dyn Backend>) -> Self {
        let defaults = Config::default();
        Self {
            registry,
            backend,
            auth_token: DEFAULT_AUTH_TOKEN.to_string(),
            hardware: None,
            bind_addr: defaults.bind_addr(),
        }
    }

    /// Set the expected bearer token
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    /// Set the hardware monitor (defaults to `nvidia-smi` + `sysinfo`)
    #[must_use]
    pub fn hardware(mut self, monitor: Arc<HardwareMonitor>) -> Self {
        self.hardware = Some(monitor);
        self
    }

    /// Set the address to bind, e.g. "0.0.0.0:8000"
    #[must_use]
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            relay: ChatRelay::new(self.registry, self.backend),
            auth_token: self.auth_token,
            hardware: self
                .hardware
                .unwrap_or_else(|| Arc::new(HardwareMonitor::new())),
        });

        ApiServer {
            state,
            bind_addr: self.bind_addr,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    bind_addr: String,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let protected = Router::new()
            .route("/models/switch", post(models::switch_model))
            .route("/chat", post(chat::chat))
            .route("/chat/optimized", post(chat::chat_optimized))
            .route_layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                auth::require_token,
            ));

        let router = Router::new()
            .route("/", get(status::root))
            .route("/health", get(status::health))
            .route("/models", get(models::list_models))
            .route("/status", get(status::status))
            .route("/system/status", get(status::system_status))
            .merge(protected)
            .with_state(self.state.clone());

        // CORS layer for cross-origin requests from browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await.map_err(|e| {
            crate::Error::Config(format!("failed to bind API server to {}: {e}", self.bind_addr))
        })?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener
    ///
    /// # Errors
    ///
    /// Returns error if the server fails while running
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
