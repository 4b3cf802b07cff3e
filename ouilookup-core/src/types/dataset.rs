//! The reference dataset: every registered prefix plus its generation time.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{HardwareAddr, Prefix, VendorRecord};
use crate::error::{OuiError, Result};

/// An immutable snapshot of the vendor registry.
///
/// Records are bucketed by prefix length so a lookup probes at most one hash
/// table per distinct length, longest first. A `Dataset` is built once by a
/// parser and then shared behind an `Arc`; it has no interior mutability.
#[derive(Clone, Debug)]
pub struct Dataset {
    generated_at: DateTime<Utc>,
    tables: BTreeMap<u8, HashMap<u64, VendorRecord>>,
    len: usize,
}

impl Dataset {
    /// Creates an empty dataset.
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            tables: BTreeMap::new(),
            len: 0,
        }
    }

    /// Builds a dataset from records. Later records replace earlier ones with the same prefix.
    pub fn from_records(
        generated_at: DateTime<Utc>,
        records: impl IntoIterator<Item = VendorRecord>,
    ) -> Self {
        let mut dataset = Self::new(generated_at);
        for record in records {
            dataset.insert(record);
        }
        dataset
    }

    /// Inserts a record, returning the one it replaced.
    pub fn insert(&mut self, record: VendorRecord) -> Option<VendorRecord> {
        let prefix = record.prefix;
        let previous = self
            .tables
            .entry(prefix.bits())
            .or_default()
            .insert(prefix.key(), record);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Finds the record with the longest prefix containing `addr`.
    pub fn lookup(&self, addr: &HardwareAddr) -> Result<&VendorRecord> {
        let value = addr.to_u64();
        self.tables
            .iter()
            .rev()
            .find_map(|(&bits, table)| table.get(&(value & Prefix::mask(bits))))
            .ok_or(OuiError::NotFound)
    }

    /// Returns the record registered for exactly this prefix.
    pub fn get(&self, prefix: &Prefix) -> Option<&VendorRecord> {
        self.tables
            .get(&prefix.bits())
            .and_then(|table| table.get(&prefix.key()))
    }

    /// When the upstream registry was produced.
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over all records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &VendorRecord> {
        self.tables.values().flat_map(|table| table.values())
    }

    /// Record counts per prefix length, shortest first.
    pub fn prefix_lengths(&self) -> Vec<(u8, usize)> {
        self.tables
            .iter()
            .map(|(&bits, table)| (bits, table.len()))
            .collect()
    }

    /// Compares this dataset against its successor.
    pub fn diff(&self, newer: &Dataset) -> UpdateSummary {
        let mut summary = UpdateSummary::default();

        for record in newer.records() {
            match self.get(&record.prefix) {
                None => summary.added += 1,
                Some(old) if old != record => summary.changed += 1,
                Some(_) => {}
            }
        }
        summary.removed = self
            .records()
            .filter(|record| newer.get(&record.prefix).is_none())
            .count();

        summary
    }
}

/// Differences between two consecutive datasets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    /// Prefixes only in the new dataset.
    pub added: usize,
    /// Prefixes only in the old dataset.
    pub removed: usize,
    /// Prefixes in both whose record differs.
    pub changed: usize,
}

impl UpdateSummary {
    /// Returns true if the datasets hold the same records.
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.changed == 0
    }
}
