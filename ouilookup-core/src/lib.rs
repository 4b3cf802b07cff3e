//! # ouilookup Core
//!
//! Core types, errors, and traits for the ouilookup hardware vendor service.
//!
//! This crate provides the building blocks used by all other ouilookup crates:
//!
//! - **Types**: Hardware addresses, prefixes, vendor records and the dataset
//! - **Errors**: One error taxonomy for the whole service
//! - **Constants**: Address sizes, defaults and client-facing messages
//! - **Traits**: Dataset source and parser interfaces
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use ouilookup_core::{Dataset, HardwareAddr, Prefix, VendorRecord};
//!
//! let db = Dataset::from_records(
//!     Utc::now(),
//!     vec![VendorRecord::new(Prefix::from_oui([0xAB, 0xCD, 0xEF]), "Acme")],
//! );
//! let addr: HardwareAddr = "AB-CD-EF-00-11-22".parse().unwrap();
//! assert_eq!(db.lookup(&addr).unwrap().manufacturer, "Acme");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{OuiError, Result};
pub use traits::*;
pub use types::*;
