//! # Hasher Module
//!
//! Computes 64-bit perceptual fingerprints for creative images.
//!
//! ## How It Works
//! 1. Normalize the image to a 32x32 grayscale grid
//! 2. Apply a 2-D DCT and keep the top-left 8x8 coefficients
//! 3. Compute the median of those 64 coefficients
//! 4. Set bit *i* when coefficient *i* is above the median
//! 5. Compare fingerprints using Hamming distance
//!
//! ## Example
//! ```rust,ignore
//! use creative_match::core::hasher::{HasherConfig, HashAlgorithm};
//! use creative_match::core::normalizer::ImageFormat;
//!
//! let hasher = HasherConfig::new().build()?;
//! let fingerprint = hasher.hash_bytes(&bytes, ImageFormat::Png)?;
//! println!("{}", fingerprint); // 16 hex digits
//! ```

mod algorithms;
mod dct;
mod fingerprint;
mod traits;

pub use algorithms::PerceptualHasher;
pub use fingerprint::Fingerprint;
pub use traits::{AlgorithmVersion, HashAlgorithm};

use crate::core::normalizer::{ImageNormalizer, DEFAULT_GRID_SIZE, DEFAULT_MAX_INPUT_BYTES};
use crate::error::HashError;

/// Default side length of the retained low-frequency block
pub const DEFAULT_BLOCK_SIZE: u32 = 8;

/// Configuration builder for hashers.
///
/// The normalized grid is always `DEFAULT_GRID_SIZE` wide: it is part of what
/// `AlgorithmVersion::DctMedianV1` promises, so it is not configurable.
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Side length of the retained DCT block
    block_size: u32,
    /// Largest encoded buffer accepted by the normalizer
    max_input_bytes: usize,
    /// Algorithm to use
    version: AlgorithmVersion,
}

impl HasherConfig {
    /// Create a new hasher configuration with defaults
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            version: AlgorithmVersion::DctMedianV1,
        }
    }

    /// Set the retained block size. Only 8 (64 bits) is valid.
    pub fn block_size(mut self, size: u32) -> Self {
        self.block_size = size;
        self
    }

    /// Set the largest encoded buffer accepted
    pub fn max_input_bytes(mut self, limit: usize) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Set the algorithm version
    pub fn version(mut self, version: AlgorithmVersion) -> Self {
        self.version = version;
        self
    }

    /// Build the hasher
    pub fn build(self) -> Result<Box<dyn HashAlgorithm>, HashError> {
        if self.block_size.checked_mul(self.block_size) != Some(Fingerprint::BITS) {
            return Err(HashError::UnsupportedDimensions {
                grid: DEFAULT_GRID_SIZE,
                block: self.block_size,
            });
        }

        let normalizer =
            ImageNormalizer::new(DEFAULT_GRID_SIZE).max_input_bytes(self.max_input_bytes);

        match self.version {
            AlgorithmVersion::DctMedianV1 => {
                Ok(Box::new(PerceptualHasher::new(normalizer, self.block_size)))
            }
        }
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}
