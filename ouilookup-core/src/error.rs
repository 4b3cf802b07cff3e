//! Error types for ouilookup.
//!
//! One error hierarchy is shared by every crate in the workspace. Variants are
//! `Clone` so that a single load outcome can be handed to every caller waiting
//! on it.

use thiserror::Error;

/// Result type alias using `OuiError`.
pub type Result<T> = std::result::Result<T, OuiError>;

/// Main error type for all ouilookup operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OuiError {
    // ═══════════════════════════════════════════════════════════════════════════
    // DATASET ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The dataset source could not deliver bytes.
    #[error("Dataset source unavailable: {0}")]
    SourceUnavailable(String),

    /// The dataset fetch exceeded its deadline.
    #[error("Dataset fetch timed out after {seconds}s")]
    SourceTimeout {
        /// The deadline that elapsed.
        seconds: u64,
    },

    /// The dataset bytes could not be parsed.
    #[error("Dataset parse failure at line {line}: {reason}")]
    ParseFailure {
        /// 1-based line number, 0 when not tied to a line.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The query does not decode to a hardware address.
    #[error("invalid hardware address: {0}")]
    MalformedAddress(String),

    /// The address is valid but no prefix in the dataset matches it.
    #[error("not found in db")]
    NotFound,

    // ═══════════════════════════════════════════════════════════════════════════
    // PLUMBING
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OuiError {
    /// Shorthand for a parse failure that is not tied to a particular line.
    pub fn parse(reason: impl Into<String>) -> Self {
        OuiError::ParseFailure {
            line: 0,
            reason: reason.into(),
        }
    }

    /// Returns true if the error was caused by the request rather than the server.
    ///
    /// Client errors carry messages that are safe to show to the caller.
    pub fn is_client_error(&self) -> bool {
        matches!(self, OuiError::MalformedAddress(_) | OuiError::NotFound)
    }

    /// Returns true if retrying the operation later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OuiError::SourceUnavailable(_) | OuiError::SourceTimeout { .. } | OuiError::Io(_)
        )
    }

    /// Returns true if this error came from obtaining or decoding the dataset.
    pub fn is_dataset_error(&self) -> bool {
        matches!(
            self,
            OuiError::SourceUnavailable(_)
                | OuiError::SourceTimeout { .. }
                | OuiError::ParseFailure { .. }
        )
    }
}

impl From<std::io::Error> for OuiError {
    fn from(err: std::io::Error) -> Self {
        OuiError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OuiError {
    fn from(err: serde_json::Error) -> Self {
        OuiError::Json(err.to_string())
    }
}

impl From<hex::FromHexError> for OuiError {
    fn from(err: hex::FromHexError) -> Self {
        OuiError::MalformedAddress(err.to_string())
    }
}
