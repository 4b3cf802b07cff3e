//! A published dataset together with its freshness deadline.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use ouilookup_core::error::Result;
use ouilookup_core::types::{Dataset, HardwareAddr, VendorRecord};

/// One consistent view of the cache.
///
/// The dataset and the deadline are published together, so a reader never
/// pairs a new dataset with an old deadline or the other way around.
#[derive(Debug)]
pub struct Snapshot {
    dataset: Arc<Dataset>,
    loaded_at: DateTime<Utc>,
    refresh_at: DateTime<Utc>,
}

impl Snapshot {
    /// Wraps a dataset loaded at `loaded_at` and due for refresh at `refresh_at`.
    pub fn new(dataset: Arc<Dataset>, loaded_at: DateTime<Utc>, refresh_at: DateTime<Utc>) -> Self {
        Self {
            dataset,
            loaded_at,
            refresh_at,
        }
    }

    /// Same dataset, new deadline.
    pub(crate) fn with_deadline(&self, refresh_at: DateTime<Utc>) -> Self {
        Self {
            dataset: Arc::clone(&self.dataset),
            loaded_at: self.loaded_at,
            refresh_at,
        }
    }

    /// The parsed registry.
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// When the upstream registry was produced.
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.dataset.generated_at()
    }

    /// When this dataset was fetched and parsed.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// After this instant the next access triggers a refresh.
    pub fn refresh_at(&self) -> DateTime<Utc> {
        self.refresh_at
    }

    /// Whether a caller at `now` should trigger a refresh.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_at
    }

    /// Longest-prefix match for `addr`.
    pub fn lookup(&self, addr: &HardwareAddr) -> Result<&VendorRecord> {
        self.dataset.lookup(addr)
    }

    /// Parses a raw query and looks it up.
    pub fn resolve(&self, query: &str) -> Result<&VendorRecord> {
        let addr = HardwareAddr::parse(query)?;
        self.lookup(&addr)
    }
}
