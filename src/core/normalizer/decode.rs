//! Format-specific decoding of in-memory image buffers.
//!
//! Uses zune-jpeg for JPEG buffers (1.5-2x faster than image crate),
//! falls back to image crate for other formats and for JPEGs zune rejects.

use super::ImageFormat;
use crate::error::HashError;
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Decode `bytes` as the declared `format`
pub fn decode_image(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, HashError> {
    match format {
        ImageFormat::Jpeg => decode_jpeg(bytes).or_else(|_| decode_fallback(bytes, format)),
        _ => decode_fallback(bytes, format),
    }
}

fn decode_error(format: ImageFormat, reason: impl Into<String>) -> HashError {
    HashError::DecodeError {
        format: format.to_string(),
        reason: reason.into(),
    }
}

/// Fast JPEG decoding using zune-jpeg
fn decode_jpeg(bytes: &[u8]) -> Result<DynamicImage, HashError> {
    let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(bytes, options);

    let pixels = decoder
        .decode()
        .map_err(|e| decode_error(ImageFormat::Jpeg, format!("zune-jpeg decode failed: {:?}", e)))?;

    let info = decoder
        .info()
        .ok_or_else(|| decode_error(ImageFormat::Jpeg, "missing image info"))?;

    let width = info.width as u32;
    let height = info.height as u32;

    let image = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
        ColorSpace::RGB => {
            let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixels)
                .ok_or_else(|| decode_error(ImageFormat::Jpeg, "RGB buffer size mismatch"))?;
            DynamicImage::ImageRgb8(buffer)
        }
        ColorSpace::RGBA => {
            let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixels)
                .ok_or_else(|| decode_error(ImageFormat::Jpeg, "RGBA buffer size mismatch"))?;
            DynamicImage::ImageRgba8(buffer)
        }
        ColorSpace::Luma => {
            let buffer: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixels)
                .ok_or_else(|| decode_error(ImageFormat::Jpeg, "Luma buffer size mismatch"))?;
            DynamicImage::ImageLuma8(buffer)
        }
        other => {
            return Err(decode_error(
                ImageFormat::Jpeg,
                format!("unexpected output colorspace {:?}", other),
            ))
        }
    };

    Ok(image)
}

/// Decode through the image crate with an explicit format
fn decode_fallback(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, HashError> {
    image::load_from_memory_with_format(bytes, format.to_image_format())
        .map_err(|e| decode_error(format, e.to_string()))
}
