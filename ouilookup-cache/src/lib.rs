//! Refreshable lookup cache for the ouilookup registry.
//!
//! Owns exactly one dataset slot: loaded once on first demand, then refreshed
//! in place whenever a caller observes that its freshness deadline has passed.
//! Readers always get a fully-formed [`Snapshot`].

#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod clock;
mod config;
mod snapshot;

pub use cache::{CacheState, CacheStats, RefreshableLookupCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, RefreshMode};
pub use snapshot::Snapshot;
