//! Image preparation before upload: every image sent to the prediction
//! provider is decoded, converted to 8-bit RGB, shrunk to fit inside
//! `MAX_DIMENSION` and re-encoded as PNG.

use crate::constants::MAX_DIMENSION;
use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::fmt::Debug;
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("could not process image: {0}")]
    Image(#[from] image::ImageError),
}

/// A PNG-encoded RGB image, bounded by `MAX_DIMENSION` on both sides
#[derive(Clone)]
pub struct NormalizedImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NormalizedImage {{ png: <{} bytes>, width: {}, height: {} }}",
            self.png.len(),
            self.width,
            self.height
        )
    }
}

impl NormalizedImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Standard base 64 of the PNG bytes
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.png)
    }
}

/// Decode `bytes` in any format the `image` crate understands and produce a
/// `NormalizedImage`. The output is always re-encoded, even when no
/// conversion or resize was needed.
pub fn normalize(bytes: &[u8]) -> Result<NormalizedImage, NormalizeError> {
    let decoded = image::load_from_memory(bytes)?;

    let rgb = if matches!(decoded, DynamicImage::ImageRgb8(_)) {
        decoded
    } else {
        DynamicImage::ImageRgb8(decoded.to_rgb8())
    };

    let (width, height) = rgb.dimensions();
    let bounded = if width > MAX_DIMENSION || height > MAX_DIMENSION {
        let resized = rgb.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
        debug!(
            "downsampled image from {width}x{height} to {}x{}",
            resized.width(),
            resized.height()
        );
        resized
    } else {
        rgb
    };

    let mut png: Vec<u8> = Vec::new();
    bounded.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;

    Ok(NormalizedImage {
        png,
        width: bounded.width(),
        height: bounded.height(),
    })
}
