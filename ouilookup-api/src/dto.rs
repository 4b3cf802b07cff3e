//! Request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ouilookup_cache::{CacheState, CacheStats};
use ouilookup_core::types::VendorRecord;

/// Query string of a lookup request.
#[derive(Debug, Default, Deserialize)]
pub struct LookupParams {
    /// Address to look up; wins over the path
    pub mac: Option<String>,
}

/// Lookup response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// The matched record
    pub data: Option<VendorRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Client-facing error message
    pub error: Option<String>,
}

impl LookupResponse {
    /// A successful lookup.
    pub fn found(record: VendorRecord) -> Self {
        Self {
            data: Some(record),
            error: None,
        }
    }

    /// A failed lookup.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Cache lifecycle state
    pub status: CacheState,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Where the dataset is fetched from
    pub source: String,
    /// Generation time of the dataset being served
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Next refresh deadline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_at: Option<DateTime<Utc>>,
    /// Number of registry entries being served
    pub entries: usize,
    /// Load and refresh counters
    pub cache: CacheStats,
}
