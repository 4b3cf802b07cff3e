//! Address types for ouilookup.
//!
//! - [`HardwareAddr`]: A canonical EUI-48 address used as the lookup key
//! - [`Prefix`]: A variable-length block of addresses assigned to one vendor

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{HARDWARE_ADDR_BITS, HARDWARE_ADDR_SIZE, MA_L_BITS, MIN_QUERY_BYTES, OUI_SIZE};
use crate::error::{OuiError, Result};

const ADDR_MASK: u64 = (1u64 << HARDWARE_ADDR_BITS) - 1;

// ═══════════════════════════════════════════════════════════════════════════════
// HARDWARE ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A 6-byte hardware (MAC) address.
///
/// Parsing accepts `-`, `:` or no separator, in any letter case. Queries
/// shorter than a full address (down to a bare OUI such as `AB-CD-EF`) are
/// zero-padded, so they match the block that contains them.
///
/// # Example
/// ```
/// use ouilookup_core::HardwareAddr;
///
/// let a: HardwareAddr = "ab:cd:ef:00:11:22".parse().unwrap();
/// let b: HardwareAddr = "ABCDEF001122".parse().unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HardwareAddr {
    bytes: [u8; HARDWARE_ADDR_SIZE],
}

impl HardwareAddr {
    /// Creates from a fixed-size array.
    pub const fn from_array(bytes: [u8; HARDWARE_ADDR_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates an address from raw bytes.
    ///
    /// Anything from a bare OUI up to a full address is accepted; missing
    /// trailing bytes are zero.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_QUERY_BYTES || bytes.len() > HARDWARE_ADDR_SIZE {
            return Err(OuiError::MalformedAddress(format!(
                "expected {} to {} bytes, got {}",
                MIN_QUERY_BYTES,
                HARDWARE_ADDR_SIZE,
                bytes.len()
            )));
        }

        let mut arr = [0u8; HARDWARE_ADDR_SIZE];
        arr[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates from the low 48 bits of an integer.
    pub fn from_u64(value: u64) -> Self {
        let be = (value & ADDR_MASK).to_be_bytes();
        let mut arr = [0u8; HARDWARE_ADDR_SIZE];
        arr.copy_from_slice(&be[8 - HARDWARE_ADDR_SIZE..]);
        Self { bytes: arr }
    }

    /// Parses a textual address.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(OuiError::MalformedAddress("empty address".into()));
        }

        let is_separator = |c: char| c == '-' || c == ':';
        let digits = if trimmed.contains(is_separator) {
            let mut out = String::with_capacity(HARDWARE_ADDR_SIZE * 2);
            for group in trimmed.split(is_separator) {
                if group.len() != 2 {
                    return Err(OuiError::MalformedAddress(format!(
                        "invalid group '{}' in '{}'",
                        group, trimmed
                    )));
                }
                out.push_str(group);
            }
            out
        } else {
            trimmed.to_string()
        };

        let bytes = hex::decode(&digits)
            .map_err(|e| OuiError::MalformedAddress(format!("'{}': {}", trimmed, e)))?;
        Self::from_bytes(&bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the address as a 48-bit integer.
    pub fn to_u64(&self) -> u64 {
        self.bytes
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    }

    /// Returns the organizationally unique identifier (first three bytes).
    pub fn oui(&self) -> [u8; OUI_SIZE] {
        [self.bytes[0], self.bytes[1], self.bytes[2]]
    }

    /// Returns true if the group (multicast) bit is set.
    pub fn is_multicast(&self) -> bool {
        self.bytes[0] & 0x01 != 0
    }

    /// Returns true if the locally-administered bit is set.
    pub fn is_local(&self) -> bool {
        self.bytes[0] & 0x02 != 0
    }

    /// Formats with the given separator, upper-case hex.
    pub fn to_string_with(&self, separator: &str) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl FromStr for HardwareAddr {
    type Err = OuiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Debug for HardwareAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HardwareAddr({})", self.to_string_with(":"))
    }
}

impl std::fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_with(":"))
    }
}

impl Serialize for HardwareAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HardwareAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PREFIX
// ═══════════════════════════════════════════════════════════════════════════════

/// A block of hardware addresses sharing their leading `bits` bits.
///
/// Bits beyond the prefix length are always zero, so two prefixes describing
/// the same block compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix {
    addr: HardwareAddr,
    bits: u8,
}

impl Prefix {
    /// Creates a prefix, clearing any bits past `bits`.
    pub fn new(addr: HardwareAddr, bits: u8) -> Result<Self> {
        if bits == 0 || bits > HARDWARE_ADDR_BITS {
            return Err(OuiError::parse(format!(
                "prefix length must be 1..={}, got {}",
                HARDWARE_ADDR_BITS, bits
            )));
        }

        Ok(Self {
            addr: HardwareAddr::from_u64(addr.to_u64() & Self::mask(bits)),
            bits,
        })
    }

    /// Creates a 24-bit (MA-L) prefix from an OUI.
    pub fn from_oui(oui: [u8; OUI_SIZE]) -> Self {
        Self {
            addr: HardwareAddr::from_array([oui[0], oui[1], oui[2], 0, 0, 0]),
            bits: MA_L_BITS,
        }
    }

    /// Bit mask selecting the leading `bits` bits of a 48-bit address.
    pub fn mask(bits: u8) -> u64 {
        if bits == 0 {
            return 0;
        }
        let bits = bits.min(HARDWARE_ADDR_BITS);
        (ADDR_MASK << (HARDWARE_ADDR_BITS - bits)) & ADDR_MASK
    }

    /// Returns the first address in the block.
    pub fn addr(&self) -> HardwareAddr {
        self.addr
    }

    /// Returns the prefix length in bits.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Returns the masked integer key used for table lookups.
    pub fn key(&self) -> u64 {
        self.addr.to_u64()
    }

    /// Returns true if `addr` falls inside this block.
    pub fn contains(&self, addr: &HardwareAddr) -> bool {
        addr.to_u64() & Self::mask(self.bits) == self.key()
    }
}

impl std::fmt::Debug for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Prefix({})", self)
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bits == MA_L_BITS {
            let oui = self.addr.oui();
            write!(f, "{:02X}:{:02X}:{:02X}", oui[0], oui[1], oui[2])
        } else {
            write!(f, "{}/{}", self.addr, self.bits)
        }
    }
}

impl FromStr for Prefix {
    type Err = OuiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((addr, bits)) => {
                let bits: u8 = bits
                    .parse()
                    .map_err(|_| OuiError::parse(format!("invalid prefix length '{}'", bits)))?;
                Self::new(HardwareAddr::parse(addr)?, bits)
            }
            None => {
                let addr = HardwareAddr::parse(s)?;
                Ok(Self::from_oui(addr.oui()))
            }
        }
    }
}

impl Serialize for Prefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Prefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("AB:CD:EF:00:11:22" ; "colons")]
    #[test_case("ABCDEF001122" ; "no separator")]
    #[test_case("AB-CD-EF-00-11-22" ; "dashes")]
    #[test_case("ab-cd-ef-00-11-22" ; "lower case")]
    #[test_case("  /AB:cd:EF:00:11:22/ " ; "padded")]
    fn test_parse_separator_forms(input: &str) {
        let addr = HardwareAddr::parse(input).unwrap();
        assert_eq!(addr.as_bytes(), &[0xAB, 0xCD, 0xEF, 0x00, 0x11, 0x22]);
    }

    #[test_case("AB-CD-EF" ; "bare oui")]
    #[test_case("abcdef" ; "bare oui no separator")]
    fn test_parse_oui_query_zero_pads(input: &str) {
        let addr = HardwareAddr::parse(input).unwrap();
        assert_eq!(addr.as_bytes(), &[0xAB, 0xCD, 0xEF, 0, 0, 0]);
    }

    #[test_case("" ; "empty")]
    #[test_case("ZZ:CD:EF:00:11:22" ; "non hex")]
    #[test_case("ABC:DEF" ; "bad grouping")]
    #[test_case("ABCDE" ; "odd length")]
    #[test_case("AB:CD" ; "too short")]
    #[test_case("AB:CD:EF:00:11:22:33" ; "too long")]
    #[test_case("AB::CD:EF" ; "empty group")]
    fn test_parse_rejects(input: &str) {
        assert!(matches!(
            HardwareAddr::parse(input),
            Err(OuiError::MalformedAddress(_))
        ));
    }

    #[test]
    fn test_u64_conversion() {
        let addr = HardwareAddr::from_array([0x00, 0x1B, 0xC5, 0x01, 0x02, 0x03]);
        assert_eq!(addr.to_u64(), 0x001B_C501_0203);
        assert_eq!(HardwareAddr::from_u64(addr.to_u64()), addr);
    }

    #[test]
    fn test_flag_bits() {
        assert!(HardwareAddr::from_array([0x01, 0, 0, 0, 0, 0]).is_multicast());
        assert!(HardwareAddr::from_array([0x02, 0, 0, 0, 0, 0]).is_local());
        let plain = HardwareAddr::from_array([0x00, 0x1B, 0xC5, 0, 0, 0]);
        assert!(!plain.is_multicast());
        assert!(!plain.is_local());
    }

    #[test]
    fn test_prefix_masks_trailing_bits() {
        let addr = HardwareAddr::parse("70:B3:D5:0F:FF:FF").unwrap();
        let prefix = Prefix::new(addr, 36).unwrap();
        assert_eq!(prefix.addr().to_string(), "70:B3:D5:00:00:00");
        assert!(prefix.contains(&HardwareAddr::parse("70:B3:D5:00:0A:BC").unwrap()));
        assert!(!prefix.contains(&HardwareAddr::parse("70:B3:D5:00:1A:BC").unwrap()));
    }

    #[test]
    fn test_prefix_rejects_bad_length() {
        let addr = HardwareAddr::default();
        assert!(Prefix::new(addr, 0).is_err());
        assert!(Prefix::new(addr, 49).is_err());
    }

    #[test]
    fn test_prefix_display_and_parse() {
        let oui = Prefix::from_oui([0xAB, 0xCD, 0xEF]);
        assert_eq!(oui.to_string(), "AB:CD:EF");
        assert_eq!("AB-CD-EF".parse::<Prefix>().unwrap(), oui);

        let block = Prefix::new(HardwareAddr::parse("8C:1F:64:F5:A0:00").unwrap(), 36).unwrap();
        assert_eq!(block.to_string(), "8C:1F:64:F5:A0:00/36");
        assert_eq!(block.to_string().parse::<Prefix>().unwrap(), block);
    }

    #[test]
    fn test_mask_values() {
        assert_eq!(Prefix::mask(24), 0xFFFF_FF00_0000);
        assert_eq!(Prefix::mask(28), 0xFFFF_FFF0_0000);
        assert_eq!(Prefix::mask(48), 0xFFFF_FFFF_FFFF);
        assert_eq!(Prefix::mask(0), 0);
    }

    #[test]
    fn test_serde_as_string() {
        let addr = HardwareAddr::parse("00-1b-c5-00-00-01").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"00:1B:C5:00:00:01\"");
        let back: HardwareAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    proptest! {
        #[test]
        fn prop_separator_forms_agree(bytes in proptest::array::uniform6(any::<u8>())) {
            let addr = HardwareAddr::from_array(bytes);
            let dashed = HardwareAddr::parse(&addr.to_string_with("-")).unwrap();
            let colons = HardwareAddr::parse(&addr.to_string_with(":")).unwrap();
            let bare = HardwareAddr::parse(&addr.to_string_with("").to_lowercase()).unwrap();
            prop_assert_eq!(dashed, addr);
            prop_assert_eq!(colons, addr);
            prop_assert_eq!(bare, addr);
        }
    }
}
