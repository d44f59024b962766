// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading for uploaded detection payloads

use image::{DynamicImage, ImageFormat, ImageReader, Limits, RgbImage};
use std::io::Cursor;
use thiserror::Error;

/// Default upload limit (10MB)
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Largest accepted width or height of a decoded image
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

/// Decoder allocation budget per image (256MB)
const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Errors raised while turning uploaded bytes into a pixel buffer
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Image exceeds decoding limits (max {0}x{0} pixels): {1}")]
    DimensionsTooLarge(u32, String),
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size of the encoded payload in bytes
    pub size_bytes: usize,
}

/// Decode raw uploaded bytes into a 3-channel RGB buffer
///
/// The format is sniffed from the content; the upload's declared
/// content-type is never consulted. Grayscale, alpha and 16-bit images are
/// converted to RGB8.
///
/// # Errors
/// - `EmptyData` for a zero-length payload
/// - `TooLarge` when the payload exceeds `max_size`
/// - `UnsupportedFormat` when no codec recognises the bytes
/// - `DimensionsTooLarge` when the declared size exceeds
///   `MAX_IMAGE_DIMENSION` on either side, checked before pixels are allocated
/// - `DecodeFailed` when the codec rejects a corrupt payload
pub fn decode_image_bytes(
    bytes: &[u8],
    max_size: usize,
) -> Result<(RgbImage, ImageInfo), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    if bytes.len() > max_size {
        return Err(ImageError::TooLarge(bytes.len(), max_size));
    }

    let format = image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(limits);

    let img = reader.decode().map_err(|e| match e {
        image::ImageError::Limits(limit) => {
            ImageError::DimensionsTooLarge(MAX_IMAGE_DIMENSION, limit.to_string())
        }
        other => ImageError::DecodeFailed(other.to_string()),
    })?;

    if img.width() == 0 || img.height() == 0 {
        return Err(ImageError::DecodeFailed("image has zero area".to_string()));
    }

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((to_rgb(img), info))
}

fn to_rgb(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

/// Get the format extension as a string
pub fn format_to_extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("unknown")
}
