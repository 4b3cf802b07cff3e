//! Cache configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ouilookup_core::constants::{DEFAULT_FETCH_TIMEOUT_SECONDS, DEFAULT_TTL_SECONDS};
use ouilookup_core::error::OuiError;

/// How the caller that notices a stale snapshot deals with the refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Spawn the refresh and return the current snapshot immediately.
    #[default]
    Background,
    /// Wait for the refresh and return whatever snapshot is current afterwards.
    Inline,
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshMode::Background => write!(f, "background"),
            RefreshMode::Inline => write!(f, "inline"),
        }
    }
}

impl FromStr for RefreshMode {
    type Err = OuiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "background" => Ok(RefreshMode::Background),
            "inline" => Ok(RefreshMode::Inline),
            other => Err(OuiError::Config(format!(
                "unknown refresh mode '{}', expected 'background' or 'inline'",
                other
            ))),
        }
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window in seconds
    pub ttl_seconds: u64,
    /// Upper bound on a single source fetch, in seconds
    pub fetch_timeout_seconds: u64,
    /// Refresh behaviour for the triggering caller
    pub refresh_mode: RefreshMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            fetch_timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECONDS,
            refresh_mode: RefreshMode::default(),
        }
    }
}

impl CacheConfig {
    /// Freshness window.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(Duration::from_secs(self.ttl_seconds))
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Fetch deadline.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }

    /// The refresh deadline for a snapshot published at `now`.
    pub fn deadline_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
