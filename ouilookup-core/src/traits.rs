//! Common traits for ouilookup.
//!
//! These traits define the collaborators of the lookup cache, so that the
//! transport and the registry format can be swapped independently.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::Dataset;

// ═══════════════════════════════════════════════════════════════════════════════
// DATASET SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for obtaining the raw registry bytes.
///
/// Implementations might use:
/// - A fixed upstream HTTP endpoint
/// - A mutable store location populated by a separate writer
/// - Static bytes (for testing)
///
/// Callers bound `fetch` with their own timeout; implementations need not.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetches the complete raw dataset.
    async fn fetch(&self) -> Result<Bytes>;

    /// Short human-readable location, used in logs.
    fn describe(&self) -> String;
}

// ═══════════════════════════════════════════════════════════════════════════════
// DATASET PARSER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for decoding raw registry bytes into a [`Dataset`].
pub trait DatasetParser: Send + Sync {
    /// Parses a complete dataset.
    fn parse(&self, raw: &[u8]) -> Result<Dataset>;

    /// Produces the successor of `current` from a fresh download.
    ///
    /// `current` is never modified; readers holding it keep a consistent view.
    /// The default treats the download as a full replacement.
    fn update(&self, current: &Dataset, raw: &[u8]) -> Result<Dataset> {
        let _ = current;
        self.parse(raw)
    }
}
