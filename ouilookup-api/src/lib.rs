//! # ouilookup API Server
//!
//! HTTP front end of the hardware vendor lookup service.
//!
//! ## Endpoints
//!
//! - `GET /:address` or `GET /?mac=<address>` - Look up the vendor of an address
//! - `GET /_ah/warmup` - Load the registry before taking traffic
//! - `GET /cron/updatedb` - Refresh the durable store from upstream
//! - `GET /health` - Cache state and statistics
//!
//! ## Example
//!
//! ```rust,ignore
//! use ouilookup_api::{ApiServer, ApiConfig};
//!
//! let server = ApiServer::new(ApiConfig::from_env())?;
//! server.run(([0, 0, 0, 0], 8080)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use dto::{HealthResponse, LookupResponse};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState, SourceKind};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use ouilookup_core::error::Result;

/// API server for ouilookup.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self::from_state(Arc::new(AppState::new(config)?)))
    }

    /// Creates a server around existing state.
    pub fn from_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Shared state handed to every handler.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            source = %self.state.cache.source_description(),
            refresh_mode = %self.state.config.cache.refresh_mode,
            "ouilookup listening on {}",
            addr
        );

        axum::serve(listener, self.router()).await
    }
}
