//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use ouilookup_cache::Snapshot;

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

fn http_date(at: DateTime<Utc>) -> HeaderValue {
    // chrono output for this format is always visible ASCII
    HeaderValue::from_str(&at.format(HTTP_DATE).to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"))
}

fn lookup_headers(ttl_seconds: u64, snapshot: &Snapshot) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl_seconds)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::EXPIRES, http_date(snapshot.refresh_at()));
    headers.insert(header::LAST_MODIFIED, http_date(snapshot.generated_at()));
    headers
}

/// GET /, GET /:address and any other path
///
/// The `mac` query parameter wins over the path.
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
    path: Option<Path<String>>,
    uri: Uri,
) -> Response {
    let query = params
        .mac
        .filter(|mac| !mac.is_empty())
        .or_else(|| path.map(|Path(address)| address))
        .unwrap_or_else(|| uri.path().to_string());

    let snapshot = match state.cache.get().await {
        Ok(snapshot) => snapshot,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let headers = lookup_headers(state.config.cache.ttl_seconds, &snapshot);

    match snapshot.resolve(&query) {
        Ok(record) => {
            debug!(query = %query, manufacturer = %record.manufacturer, "Lookup hit");
            (headers, Json(LookupResponse::found(record.clone()))).into_response()
        }
        Err(e) => (headers, ApiError::from(e)).into_response(),
    }
}

/// GET /_ah/warmup
pub async fn warmup(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.cache.warm_up().await?;
    Ok(StatusCode::OK)
}

/// GET /cron/updatedb
pub async fn update_store(State(state): State<Arc<AppState>>) -> Result<&'static str> {
    match state.store_writer.refresh().await {
        Ok(bytes) => {
            info!(bytes, path = %state.store_writer.path().display(), "Store updated");
            Ok("OK")
        }
        Err(e) => {
            error!(error = %e, "Failed to update store");
            Err(ApiError::internal())
        }
    }
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let current = state.cache.current();

    Json(HealthResponse {
        status: state.cache.state(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        source: state.cache.source_description(),
        generated_at: current.as_ref().map(|s| s.generated_at()),
        refresh_at: current.as_ref().map(|s| s.refresh_at()),
        entries: current.as_ref().map(|s| s.dataset().len()).unwrap_or(0),
        cache: state.cache.stats(),
    })
}
