//! # Normalizer Module
//!
//! Turns encoded image bytes into a fixed-size grayscale grid.
//!
//! ## How It Works
//! 1. Reject empty or oversized buffers up front
//! 2. Decode with the declared format (zune-jpeg for JPEG, image crate otherwise)
//! 3. Convert to 8-bit luma
//! 4. Resample to a square grid with a fixed Lanczos3 filter
//!
//! Every step is single-threaded and free of randomness, so the grid is a
//! pure function of the input bytes.

mod decode;

pub use decode::decode_image;

use crate::error::HashError;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default side length of the normalized grid
pub const DEFAULT_GRID_SIZE: u32 = 32;

/// Default upper bound for a single encoded image (64 MiB)
pub const DEFAULT_MAX_INPUT_BYTES: usize = 64 * 1024 * 1024;

/// Image extensions that are recognized but never decoded
const UNSUPPORTED_IMAGE_EXTENSIONS: &[&str] = &[
    "heic", "heif", "avif", "svg", "ico", "psd", "raw", "cr2", "nef", "arw", "dng",
];

/// Supported image encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
}

impl ImageFormat {
    /// All supported formats
    pub const ALL: [ImageFormat; 6] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
        ImageFormat::WebP,
    ];

    /// Detect format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from a file path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Detect the format of an image file.
    ///
    /// `Ok(None)` means the file is not an image. An image in an encoding
    /// that cannot be decoded (HEIC, SVG, camera RAW...) is an
    /// `UnsupportedFormat` error, so callers can report it.
    pub fn detect(path: &Path) -> Result<Option<Self>, HashError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Ok(None);
        };
        if let Some(format) = Self::from_extension(ext) {
            return Ok(Some(format));
        }

        let ext = ext.to_lowercase();
        if UNSUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Err(HashError::UnsupportedFormat { format: ext });
        }
        Ok(None)
    }

    /// Detect format from a MIME type, as reported by cloud stores
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            "image/bmp" => Some(ImageFormat::Bmp),
            "image/tiff" => Some(ImageFormat::Tiff),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// The matching `image` crate format
    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
            ImageFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Gif => "GIF",
            ImageFormat::Bmp => "BMP",
            ImageFormat::Tiff => "TIFF",
            ImageFormat::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

/// A square grid of 8-bit luma values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedGrid {
    size: u32,
    values: Vec<u8>,
}

impl NormalizedGrid {
    /// Build a grid from row-major values.
    ///
    /// Fails if `values` does not hold exactly `size * size` entries.
    pub fn from_values(size: u32, values: Vec<u8>) -> Result<Self, HashError> {
        if size == 0 || values.len() != (size as usize) * (size as usize) {
            return Err(HashError::InvalidImage {
                reason: format!(
                    "grid of side {} cannot hold {} values",
                    size,
                    values.len()
                ),
            });
        }
        Ok(Self { size, values })
    }

    /// Side length of the grid
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Value at column `x`, row `y`
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.values[(y * self.size + x) as usize]
    }

    /// Row-major values
    pub fn values(&self) -> &[u8] {
        &self.values
    }
}

/// Decodes and resamples images into [`NormalizedGrid`]s
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    grid_size: u32,
    max_input_bytes: usize,
}

impl ImageNormalizer {
    /// Create a normalizer producing `grid_size` x `grid_size` grids
    pub fn new(grid_size: u32) -> Self {
        Self {
            grid_size,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }

    /// Set the largest encoded buffer accepted
    pub fn max_input_bytes(mut self, limit: usize) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Side length of the grids this normalizer produces
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Decode `bytes` as `format` and reduce them to a grid
    pub fn normalize(&self, bytes: &[u8], format: ImageFormat) -> Result<NormalizedGrid, HashError> {
        if bytes.is_empty() {
            return Err(HashError::InvalidImage {
                reason: "zero-byte input".to_string(),
            });
        }
        if bytes.len() > self.max_input_bytes {
            return Err(HashError::InvalidImage {
                reason: format!(
                    "input of {} bytes exceeds the {} byte limit",
                    bytes.len(),
                    self.max_input_bytes
                ),
            });
        }

        let image = decode_image(bytes, format)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(HashError::InvalidImage {
                reason: format!("zero-dimension image ({}x{})", image.width(), image.height()),
            });
        }

        let gray = image.to_luma8();
        let resized = imageops::resize(&gray, self.grid_size, self.grid_size, FilterType::Lanczos3);

        NormalizedGrid::from_values(self.grid_size, resized.into_raw())
    }
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}
