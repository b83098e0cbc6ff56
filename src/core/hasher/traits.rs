//! Trait definitions for fingerprint algorithms.

use super::Fingerprint;
use crate::core::normalizer::{ImageFormat, ImageNormalizer, NormalizedGrid};
use crate::error::HashError;
use serde::{Deserialize, Serialize};

/// Identifies the exact algorithm and bit width that produced a fingerprint.
///
/// Fingerprints are only comparable when their versions match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmVersion {
    /// 32x32 Lanczos3 luma grid, 8x8 DCT-II block, median threshold, 64 bits
    #[default]
    DctMedianV1,
}

impl AlgorithmVersion {
    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            AlgorithmVersion::DctMedianV1 => {
                "Perceptual Hash (pHash) - 8x8 low-frequency DCT block thresholded at its median"
            }
        }
    }
}

impl std::fmt::Display for AlgorithmVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmVersion::DctMedianV1 => write!(f, "dct-median-v1"),
        }
    }
}

/// Trait for fingerprint algorithm implementations
pub trait HashAlgorithm: Send + Sync {
    /// Fingerprint an already-normalized grid. Never fails.
    fn hash_grid(&self, grid: &NormalizedGrid) -> Fingerprint;

    /// The normalizer whose grids this algorithm expects
    fn normalizer(&self) -> &ImageNormalizer;

    /// Normalize encoded bytes, then fingerprint them
    fn hash_bytes(&self, bytes: &[u8], format: ImageFormat) -> Result<Fingerprint, HashError> {
        let grid = self.normalizer().normalize(bytes, format)?;
        Ok(self.hash_grid(&grid))
    }

    /// The algorithm version stamped on every collection it fills
    fn version(&self) -> AlgorithmVersion;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_display_is_stable() {
        assert_eq!(AlgorithmVersion::DctMedianV1.to_string(), "dct-median-v1");
    }

    #[test]
    fn version_serializes_kebab_case() {
        let json = serde_json::to_string(&AlgorithmVersion::DctMedianV1).unwrap();
        assert_eq!(json, "\"dct-median-v1\"");
    }
}
