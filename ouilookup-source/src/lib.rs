//! Dataset sources for ouilookup.
//!
//! - [`HttpSource`]: the fixed upstream registry endpoint
//! - [`FileStoreSource`]: a durable copy kept on disk
//! - [`StoreWriter`]: repopulates the durable copy from upstream

#![warn(missing_docs, rust_2018_idioms)]

mod http;
mod store;

pub use http::{HttpSource, HttpSourceConfig};
pub use store::{FileStoreSource, StoreWriter};
