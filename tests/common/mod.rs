//! Synthetic creatives shared by the integration tests.

#![allow(dead_code)]

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};
use std::io::Cursor;

/// Small deterministic generator so fixtures never change between runs
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn shade(&mut self) -> Rgb<u8> {
        Rgb([
            (self.next() % 256) as u8,
            (self.next() % 256) as u8,
            (self.next() % 256) as u8,
        ])
    }
}

/// A flat background with five overlapping blocks, laid out in
/// thousandths of the canvas so any size renders the same design.
pub fn creative(seed: u64, width: u32, height: u32) -> RgbImage {
    let mut rng = Lcg(seed);
    let background = rng.shade();
    let blocks: Vec<_> = (0..5)
        .map(|_| {
            let x0 = rng.next() % 800;
            let y0 = rng.next() % 800;
            let x1 = (x0 + 150 + rng.next() % 450).min(1000);
            let y1 = (y0 + 150 + rng.next() % 450).min(1000);
            (x0, y0, x1, y1, rng.shade())
        })
        .collect();

    let (w, h) = (width as u64, height as u64);
    let mut image = ImageBuffer::from_pixel(width, height, background);
    for (x0, y0, x1, y1, shade) in blocks {
        for y in (y0 * h / 1000)..(y1 * h / 1000) {
            for x in (x0 * w / 1000)..(x1 * w / 1000) {
                image.put_pixel(x as u32, y as u32, shade);
            }
        }
    }
    image
}

pub fn png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn jpeg(image: &RgbImage, quality: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(image)
        .unwrap();
    bytes
}

/// Scale by `factor` with a smooth filter, as an export pipeline would
pub fn resized(image: &RgbImage, factor: f32) -> RgbImage {
    let width = (image.width() as f32 * factor).round() as u32;
    let height = (image.height() as f32 * factor).round() as u32;
    imageops::resize(image, width, height, FilterType::Triangle)
}
