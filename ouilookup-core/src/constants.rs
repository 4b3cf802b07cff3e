//! Constants shared across the ouilookup crates.

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of an EUI-48 hardware address in bytes.
pub const HARDWARE_ADDR_SIZE: usize = 6;

/// Size of an IEEE organizationally unique identifier in bytes.
pub const OUI_SIZE: usize = 3;

/// Number of bits in a hardware address.
pub const HARDWARE_ADDR_BITS: u8 = (HARDWARE_ADDR_SIZE * 8) as u8;

/// Shortest query accepted by the lookup service (a bare OUI).
pub const MIN_QUERY_BYTES: usize = OUI_SIZE;

/// Prefix length of an MA-L (OUI) block.
pub const MA_L_BITS: u8 = 24;

/// Prefix length of an MA-M block.
pub const MA_M_BITS: u8 = 28;

/// Prefix length of an MA-S block.
pub const MA_S_BITS: u8 = 36;

// ═══════════════════════════════════════════════════════════════════════════════
// DATASET SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Canonical location of the IEEE MA-L public listing.
pub const DEFAULT_UPSTREAM_URL: &str = "http://standards-oui.ieee.org/oui.txt";

/// Default freshness window: one day.
pub const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Upper bound on a single dataset fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT-FACING MESSAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// Message returned when an address has no matching prefix.
pub const NOT_FOUND_MESSAGE: &str = "not found in db";

/// Hint appended to malformed address errors.
pub const USAGE_HINT: &str = "Usage 'https://<host>/AB-CD-EF' (dashes can be colons or omitted).";

/// Message shown to clients for any server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";
