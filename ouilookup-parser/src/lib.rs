//! Parser for the IEEE public registry listings (`oui.txt`, `mam.txt`, `oui36.txt`).
//!
//! Produces an immutable [`Dataset`](ouilookup_core::Dataset) keyed by prefix.

#![warn(missing_docs, rust_2018_idioms)]

mod oui;

pub use oui::OuiParser;
