//! The 64-bit perceptual fingerprint and its text form.

use crate::error::FingerprintParseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 64-bit perceptual fingerprint.
///
/// Bit `i` of the raster-ordered coefficient block is stored at integer bit
/// `63 - i`, so the first coefficient is the most significant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Number of bits in every fingerprint
    pub const BITS: u32 = 64;

    /// Wrap a raw 64-bit value
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Build a fingerprint from raster-ordered bits (first bit = MSB).
    ///
    /// Bits past the 64th are ignored; missing bits are zero.
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut value = 0u64;
        for (i, bit) in bits.into_iter().take(Self::BITS as usize).enumerate() {
            if bit {
                value |= 1 << (63 - i);
            }
        }
        Self(value)
    }

    /// The raw value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Bit `index` in raster order (0 = most significant)
    pub fn bit(&self, index: u32) -> bool {
        index < Self::BITS && (self.0 >> (63 - index)) & 1 == 1
    }

    /// Hamming distance: number of differing bits
    pub fn distance(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Similarity as a percentage (0-100)
    pub fn similarity(&self, other: &Self) -> f64 {
        (1.0 - self.distance(other) as f64 / Self::BITS as f64) * 100.0
    }

    /// 16 lowercase hex digits, most significant first
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// 64 binary digits, most significant first
    pub fn to_bit_string(&self) -> String {
        format!("{:064b}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintParseError;

    /// Accepts 16 hex digits (either case) or 64 binary digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let radix = match s.len() {
            16 => 16,
            64 => 2,
            length => return Err(FingerprintParseError::InvalidLength { length }),
        };

        if let Some((position, digit)) = s.chars().enumerate().find(|(_, c)| !c.is_digit(radix)) {
            return Err(FingerprintParseError::InvalidDigit { digit, position });
        }

        // All digits validated above, so this cannot overflow or fail.
        u64::from_str_radix(s, radix)
            .map(Self)
            .map_err(|_| FingerprintParseError::InvalidLength { length: s.len() })
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
