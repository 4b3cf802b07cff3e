//! Domain types for ouilookup.
//!
//! - [`HardwareAddr`]: Canonical lookup key
//! - [`Prefix`]: Variable-length address block
//! - [`VendorRecord`]: Registry entry for one block
//! - [`Dataset`]: Immutable snapshot of the whole registry

mod address;
mod dataset;
mod record;

pub use address::*;
pub use dataset::*;
pub use record::*;
