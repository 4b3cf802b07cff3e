//! App state: config, registry cache, store writer.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use ouilookup_cache::{CacheConfig, RefreshableLookupCache};
use ouilookup_core::constants::DEFAULT_UPSTREAM_URL;
use ouilookup_core::error::{OuiError, Result};
use ouilookup_core::traits::DatasetSource;
use ouilookup_parser::OuiParser;
use ouilookup_source::{FileStoreSource, HttpSource, HttpSourceConfig, StoreWriter};

const DEFAULT_STORE_PATH: &str = "./data/oui.txt";

/// Where the cache reads the registry from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// The upstream registry endpoint
    #[default]
    Upstream,
    /// The durable store, refreshed by `/cron/updatedb`
    Store,
}

impl FromStr for SourceKind {
    type Err = OuiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upstream" => Ok(SourceKind::Upstream),
            "store" => Ok(SourceKind::Store),
            other => Err(OuiError::Config(format!(
                "unknown source '{}', expected 'upstream' or 'store'",
                other
            ))),
        }
    }
}

/// API server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Which source the cache loads from
    pub source: SourceKind,
    /// Upstream registry URL
    pub upstream_url: String,
    /// Durable store location
    pub store_path: PathBuf,
    /// Cache timing and refresh mode
    pub cache: CacheConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            upstream_url: DEFAULT_UPSTREAM_URL.into(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            cache: CacheConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Reads `OUI_*` variables, loading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            source: parse_or("OUI_SOURCE", &get, defaults.source),
            upstream_url: get("OUI_UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            store_path: get("OUI_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            cache: CacheConfig {
                ttl_seconds: parse_or("OUI_TTL_SECONDS", &get, defaults.cache.ttl_seconds),
                fetch_timeout_seconds: parse_or(
                    "OUI_FETCH_TIMEOUT_SECONDS",
                    &get,
                    defaults.cache.fetch_timeout_seconds,
                ),
                refresh_mode: parse_or("OUI_REFRESH_MODE", &get, defaults.cache.refresh_mode),
            },
        }
    }
}

fn parse_or<T>(key: &str, get: impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, "Invalid setting, using default");
            default
        }),
        None => default,
    }
}

/// Shared application state.
pub struct AppState {
    /// Configuration the state was built from
    pub config: ApiConfig,
    /// The registry cache
    pub cache: RefreshableLookupCache,
    /// Writer behind `/cron/updatedb`
    pub store_writer: StoreWriter,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    /// Wires the cache and store writer described by `config`.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let upstream: Arc<dyn DatasetSource> = Arc::new(HttpSource::with_config(HttpSourceConfig {
            url: config.upstream_url.clone(),
            timeout_seconds: config.cache.fetch_timeout_seconds,
        })?);

        let source: Arc<dyn DatasetSource> = match config.source {
            SourceKind::Upstream => Arc::clone(&upstream),
            SourceKind::Store => Arc::new(FileStoreSource::new(&config.store_path)),
        };

        let cache =
            RefreshableLookupCache::with_config(source, Arc::new(OuiParser::new()), config.cache.clone());
        let store_writer = StoreWriter::new(upstream, &config.store_path);

        Ok(Self::from_parts(config, cache, store_writer))
    }

    /// Assembles state from prebuilt parts.
    pub fn from_parts(config: ApiConfig, cache: RefreshableLookupCache, store_writer: StoreWriter) -> Self {
        Self {
            config,
            cache,
            store_writer,
            started_at: Instant::now(),
        }
    }
}
