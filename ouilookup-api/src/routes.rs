//! API route configuration.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
///
/// Every path not claimed by an operational route is treated as a lookup.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Operational
        .route("/health", get(handlers::health_check))
        .route("/_ah/warmup", get(handlers::warmup))
        .route("/cron/updatedb", get(handlers::update_store))

        // Lookup
        .route("/", get(handlers::lookup))
        .route("/:address", get(handlers::lookup))
        .fallback(handlers::lookup)

        .with_state(state)
}
