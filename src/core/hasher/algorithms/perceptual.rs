//! Perceptual Hash (pHash) implementation.
//!
//! pHash uses the Discrete Cosine Transform (DCT) to extract
//! frequency information from the image. Keeping only the lowest
//! frequencies and comparing them to their median makes it robust to:
//! - Scaling
//! - Brightness/contrast changes
//! - Compression artifacts and re-encoding

use super::super::dct::LowFrequencyDct;
use super::super::traits::{AlgorithmVersion, HashAlgorithm};
use super::super::Fingerprint;
use crate::core::normalizer::{ImageNormalizer, NormalizedGrid};

/// DCT-median perceptual hasher producing 64-bit fingerprints
pub struct PerceptualHasher {
    normalizer: ImageNormalizer,
    dct: LowFrequencyDct,
    block_size: u32,
}

impl PerceptualHasher {
    /// Create a hasher over `normalizer`'s grids keeping a `block_size` square
    /// of coefficients. `block_size * block_size` must be 64.
    pub(crate) fn new(normalizer: ImageNormalizer, block_size: u32) -> Self {
        let dct = LowFrequencyDct::new(normalizer.grid_size() as usize, block_size as usize);
        Self {
            normalizer,
            dct,
            block_size,
        }
    }
}

/// Median of a non-empty slice, averaging the two middle values for even lengths
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

impl HashAlgorithm for PerceptualHasher {
    fn hash_grid(&self, grid: &NormalizedGrid) -> Fingerprint {
        // Grids from a different normalizer are resampled to ours first.
        let coefficients = if grid.size() == self.normalizer.grid_size() {
            self.dct.transform(grid.values())
        } else {
            let resized = resample(grid, self.normalizer.grid_size());
            self.dct.transform(&resized)
        };

        debug_assert_eq!(coefficients.len(), (self.block_size * self.block_size) as usize);

        let threshold = median(&coefficients);
        Fingerprint::from_bits(coefficients.iter().map(|&c| c > threshold))
    }

    fn normalizer(&self) -> &ImageNormalizer {
        &self.normalizer
    }

    fn version(&self) -> AlgorithmVersion {
        AlgorithmVersion::DctMedianV1
    }
}

/// Nearest-neighbour resample used only for foreign-sized grids
fn resample(grid: &NormalizedGrid, size: u32) -> Vec<u8> {
    let src = grid.size();
    let mut out = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            out.push(grid.get(x * src / size, y * src / size));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalizer::ImageFormat;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb};
    use std::io::Cursor;

    fn hasher() -> PerceptualHasher {
        PerceptualHasher::new(ImageNormalizer::default(), 8)
    }

    fn layout_image() -> DynamicImage {
        // Irregular rectangles over a diagonal ramp, no symmetry to cancel terms.
        let rects = [
            (12u32, 9u32, 70u32, 41u32, 230u8),
            (95, 20, 150, 64, 40),
            (30, 70, 88, 112, 180),
            (120, 85, 158, 117, 10),
        ];
        let img = ImageBuffer::from_fn(160, 120, |x, y| {
            let mut v = ((x + 2 * y) * 255 / 400) as u8;
            for &(x0, y0, x1, y1, shade) in &rects {
                if x >= x0 && x < x1 && y >= y0 && y < y1 {
                    v = shade;
                }
            }
            Rgb([v, v.saturating_add(20), v / 2])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn png(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn gray_png(image: GrayImage) -> Vec<u8> {
        png(&DynamicImage::ImageLuma8(image))
    }

    #[test]
    fn grid_sized_gray_image_has_known_fingerprint() {
        // 32x32 grayscale skips both luma conversion and resampling, so the
        // grid is the pixels themselves.
        let image = ImageBuffer::from_fn(32, 32, |x, y| {
            Luma([((x * x + 3 * y * y + 5 * x * y) % 251) as u8])
        });

        let fp = hasher().hash_bytes(&gray_png(image), ImageFormat::Png).unwrap();
        assert_eq!(fp.to_hex(), "ae1307030e2f1f6f");
    }

    #[test]
    fn downscaled_blocks_have_known_fingerprint() {
        // Even shades on a 2:1 downscale keep every Lanczos3 output well
        // away from a rounding boundary.
        let image = ImageBuffer::from_fn(64, 64, |x, y| {
            let shade = if (10..30).contains(&x) && (44..58).contains(&y) {
                240
            } else if y < 40 {
                if x < 24 { 30 } else { 200 }
            } else if x < 40 {
                120
            } else {
                60
            };
            Luma([shade])
        });

        let fp = hasher().hash_bytes(&gray_png(image), ImageFormat::Png).unwrap();
        assert_eq!(fp.to_hex(), "8c9c63c33cc6799c");
    }

    #[test]
    fn lossless_encodings_share_a_fingerprint() {
        let hasher = hasher();
        let image = layout_image();
        let expected = hasher.hash_bytes(&png(&image), ImageFormat::Png).unwrap();

        for (ours, theirs) in [
            (ImageFormat::Bmp, image::ImageFormat::Bmp),
            (ImageFormat::Tiff, image::ImageFormat::Tiff),
            (ImageFormat::WebP, image::ImageFormat::WebP),
        ] {
            let mut bytes = Vec::new();
            image.write_to(&mut Cursor::new(&mut bytes), theirs).unwrap();
            let fp = hasher.hash_bytes(&bytes, ours).unwrap();
            assert_eq!(fp, expected, "{}", ours);
        }
    }

    #[test]
    fn median_of_even_length_averages_middle() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
    }

    #[test]
    fn identical_bytes_produce_identical_fingerprint() {
        let hasher = hasher();
        let bytes = png(&layout_image());

        let first = hasher.hash_bytes(&bytes, ImageFormat::Png).unwrap();
        let second = hasher.hash_bytes(&bytes, ImageFormat::Png).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn roughly_half_the_bits_are_set() {
        let hasher = hasher();
        let fp = hasher.hash_bytes(&png(&layout_image()), ImageFormat::Png).unwrap();
        let ones = fp.as_u64().count_ones();
        // Strictly-greater-than-median sets at most 32 bits.
        assert!(ones <= 32, "got {} bits set", ones);
    }

    #[test]
    fn inverted_image_differs_strongly() {
        let hasher = hasher();
        let grid = ImageNormalizer::default()
            .normalize(&png(&layout_image()), ImageFormat::Png)
            .unwrap();
        let inverted =
            NormalizedGrid::from_values(32, grid.values().iter().map(|v| 255 - v).collect())
                .unwrap();

        let distance = hasher.hash_grid(&grid).distance(&hasher.hash_grid(&inverted));
        assert!(distance > 20, "expected a large distance, got {}", distance);
    }

    #[test]
    fn foreign_grid_size_is_resampled() {
        let hasher = hasher();
        let grid = NormalizedGrid::from_values(64, (0..64 * 64).map(|i| (i % 251) as u8).collect())
            .unwrap();
        // Must not panic, and must stay deterministic.
        assert_eq!(hasher.hash_grid(&grid), hasher.hash_grid(&grid));
    }

    #[test]
    fn version_is_dct_median() {
        assert_eq!(hasher().version(), AlgorithmVersion::DctMedianV1);
    }
}
