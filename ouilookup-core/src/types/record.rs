//! Vendor registration records.

use serde::{Deserialize, Serialize};

use super::Prefix;

/// A registry entry: one address block and the organization it is assigned to.
///
/// Immutable once placed in a [`Dataset`](super::Dataset).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRecord {
    /// Registered organization name
    pub manufacturer: String,
    /// Postal address lines, as listed in the registry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,
    /// The assigned block
    pub prefix: Prefix,
    /// ISO 3166 country code, when listed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Block lies in the locally-administered range
    pub local: bool,
    /// Block lies in the group (multicast) range
    pub multicast: bool,
}

impl VendorRecord {
    /// Creates a record with no postal metadata.
    pub fn new(prefix: Prefix, manufacturer: impl Into<String>) -> Self {
        let first = prefix.addr();
        Self {
            manufacturer: manufacturer.into(),
            address: Vec::new(),
            prefix,
            country: None,
            local: first.is_local(),
            multicast: first.is_multicast(),
        }
    }

    /// Attaches postal address lines.
    pub fn with_address(mut self, lines: Vec<String>) -> Self {
        self.address = lines;
        self
    }

    /// Attaches a country code.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}
