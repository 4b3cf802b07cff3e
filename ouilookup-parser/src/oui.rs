//! IEEE registry text format.
//!
//! # Format
//!
//! ```text
//! Generated: Wed, 01 May 2024 12:00:00 +0000        (optional header)
//!
//! AB-CD-EF   (hex)        Acme Networks, Inc.
//! ABCDEF     (base 16)    Acme Networks, Inc.       (24-bit block)
//!                         100 Example Road
//!                         US                        (country code)
//!
//! 00-1B-C5   (hex)        Tiny Sensors GmbH
//! 001000-001FFF     (base 16)    Tiny Sensors GmbH  (sub-block of 00-1B-C5)
//! ```
//!
//! A blank line ends a record. Columns are separated by tabs in the upstream
//! files but any whitespace is accepted.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use ouilookup_core::constants::{HARDWARE_ADDR_BITS, MA_L_BITS, OUI_SIZE};
use ouilookup_core::error::{OuiError, Result};
use ouilookup_core::traits::DatasetParser;
use ouilookup_core::types::{Dataset, HardwareAddr, Prefix, VendorRecord};

const HEX_MARKER: &str = "(hex)";
const BASE16_MARKER: &str = "(base 16)";
const GENERATED_HEADER: &str = "Generated:";

/// Lower 24 bits span of a full MA-L block.
const BLOCK_SPAN: u32 = 1 << 24;

/// Parser for the IEEE public listing format.
#[derive(Clone, Debug, Default)]
pub struct OuiParser;

impl OuiParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }
}

impl DatasetParser for OuiParser {
    fn parse(&self, raw: &[u8]) -> Result<Dataset> {
        let text = String::from_utf8_lossy(raw);
        let mut generated_at: Option<DateTime<Utc>> = None;
        let mut records = Vec::new();
        let mut pending: Option<PendingRecord> = None;
        let mut line_count = 0;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            line_count = line_no;
            let line = raw_line.trim_end_matches('\r');

            if line.trim().is_empty() {
                if let Some(record) = pending.take() {
                    records.push(record.finish()?);
                }
                continue;
            }

            if let Some((head, tail)) = line.split_once(HEX_MARKER) {
                if let Some(record) = pending.take() {
                    records.push(record.finish()?);
                }
                pending = Some(PendingRecord::open(line_no, head, tail)?);
                continue;
            }

            if let Some((head, tail)) = line.split_once(BASE16_MARKER) {
                let record = pending.as_mut().ok_or_else(|| OuiError::ParseFailure {
                    line: line_no,
                    reason: "base 16 line without a preceding hex line".into(),
                })?;
                record.set_block(line_no, head, tail)?;
                continue;
            }

            if let Some(value) = line.trim_start().strip_prefix(GENERATED_HEADER) {
                let parsed = DateTime::parse_from_rfc2822(value.trim()).map_err(|e| {
                    OuiError::ParseFailure {
                        line: line_no,
                        reason: format!("invalid generation date '{}': {}", value.trim(), e),
                    }
                })?;
                generated_at = Some(parsed.with_timezone(&Utc));
                continue;
            }

            match pending.as_mut() {
                Some(record) if record.block_seen && line.starts_with(char::is_whitespace) => {
                    record.address.push(line.trim().to_string());
                }
                // Column headers and anything else outside a record.
                _ => {}
            }
        }

        if let Some(record) = pending.take() {
            records.push(record.finish()?);
        }

        if records.is_empty() {
            return Err(OuiError::ParseFailure {
                line: line_count,
                reason: "no records found".into(),
            });
        }

        let dataset = Dataset::from_records(generated_at.unwrap_or_else(Utc::now), records);
        debug!(
            records = dataset.len(),
            generated_at = %dataset.generated_at(),
            "Parsed registry"
        );
        Ok(dataset)
    }

    fn update(&self, current: &Dataset, raw: &[u8]) -> Result<Dataset> {
        let next = self.parse(raw)?;
        let summary = current.diff(&next);
        info!(
            added = summary.added,
            removed = summary.removed,
            changed = summary.changed,
            generated_at = %next.generated_at(),
            "Registry update parsed"
        );
        Ok(next)
    }
}

/// A record whose lines are still being read.
struct PendingRecord {
    line: usize,
    oui: [u8; OUI_SIZE],
    manufacturer: String,
    /// Inclusive range of the lower 24 bits, when narrower than the full block
    range: Option<(u32, u32)>,
    block_seen: bool,
    address: Vec<String>,
}

impl PendingRecord {
    fn open(line: usize, head: &str, tail: &str) -> Result<Self> {
        let digits: String = head.trim().split('-').collect();
        let bytes = hex::decode(&digits).map_err(|e| OuiError::ParseFailure {
            line,
            reason: format!("invalid OUI '{}': {}", head.trim(), e),
        })?;
        if bytes.len() != OUI_SIZE {
            return Err(OuiError::ParseFailure {
                line,
                reason: format!("OUI '{}' must be {} bytes", head.trim(), OUI_SIZE),
            });
        }

        Ok(Self {
            line,
            oui: [bytes[0], bytes[1], bytes[2]],
            manufacturer: tail.trim().to_string(),
            range: None,
            block_seen: false,
            address: Vec::new(),
        })
    }

    fn set_block(&mut self, line: usize, head: &str, tail: &str) -> Result<()> {
        let head = head.trim();
        match head.split_once('-') {
            Some((low, high)) => {
                let low = parse_u24(line, low)?;
                let high = parse_u24(line, high)?;
                self.range = Some((low, high));
            }
            None => {
                let value = parse_u24(line, head)?;
                let expected = u32::from_be_bytes([0, self.oui[0], self.oui[1], self.oui[2]]);
                if value != expected {
                    return Err(OuiError::ParseFailure {
                        line,
                        reason: format!("base 16 id '{}' does not match hex id", head),
                    });
                }
            }
        }

        if self.manufacturer.is_empty() {
            self.manufacturer = tail.trim().to_string();
        }
        self.block_seen = true;
        Ok(())
    }

    fn finish(mut self) -> Result<VendorRecord> {
        if self.manufacturer.is_empty() {
            return Err(OuiError::ParseFailure {
                line: self.line,
                reason: "record has no organization name".into(),
            });
        }

        let (low, bits) = match self.range {
            None => (0, MA_L_BITS),
            Some((low, high)) => (low, block_bits(self.line, low, high)?),
        };

        let low = low.to_be_bytes();
        let addr = HardwareAddr::from_array([self.oui[0], self.oui[1], self.oui[2], low[1], low[2], low[3]]);
        let prefix = Prefix::new(addr, bits).map_err(|e| OuiError::ParseFailure {
            line: self.line,
            reason: e.to_string(),
        })?;

        let country = match self.address.last() {
            Some(last) if is_country_code(last) => self.address.pop(),
            _ => None,
        };

        let mut record = VendorRecord::new(prefix, self.manufacturer).with_address(self.address);
        if let Some(country) = country {
            record = record.with_country(country);
        }
        Ok(record)
    }
}

fn parse_u24(line: usize, digits: &str) -> Result<u32> {
    let digits = digits.trim();
    let bytes = hex::decode(digits).map_err(|e| OuiError::ParseFailure {
        line,
        reason: format!("invalid block id '{}': {}", digits, e),
    })?;
    if bytes.len() != 3 {
        return Err(OuiError::ParseFailure {
            line,
            reason: format!("block id '{}' must be 6 hex digits", digits),
        });
    }
    Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
}

/// Prefix length of an aligned power-of-two range inside an MA-L block.
fn block_bits(line: usize, low: u32, high: u32) -> Result<u8> {
    let invalid = || OuiError::ParseFailure {
        line,
        reason: format!("block range {:06X}-{:06X} is not an aligned power of two", low, high),
    };

    if high < low || high >= BLOCK_SPAN {
        return Err(invalid());
    }
    let span = high - low + 1;
    if !span.is_power_of_two() || low % span != 0 {
        return Err(invalid());
    }
    Ok(HARDWARE_ADDR_BITS - span.trailing_zeros() as u8)
}

fn is_country_code(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_uppercase())
}
