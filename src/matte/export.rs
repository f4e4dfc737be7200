//! Encoding composited results for download and clipboard

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, Rgba};
use imageproc::definitions::Image;

use crate::error::ExportError;

/// Default JPEG quality, on the encoder's 1..=100 scale.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Encodes an RGBA buffer as PNG, alpha included.
///
/// # Errors
///
/// * `ExportError::Encoding` - When the PNG encoder fails
pub fn encode_png(image: &Image<Rgba<u8>>) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ExportError::Encoding {
            format: "PNG",
            message: e.to_string(),
        })?;

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        len = bytes.len(),
        "encoded PNG"
    );
    Ok(bytes)
}

/// Encodes an RGB buffer as baseline JPEG.
///
/// `quality` is clamped to `1..=100`.
///
/// # Errors
///
/// * `ExportError::Encoding` - When the JPEG encoder fails
pub fn encode_jpeg(image: &Image<Rgb<u8>>, quality: u8) -> Result<Vec<u8>, ExportError> {
    let quality = quality.clamp(1, 100);
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| ExportError::Encoding {
            format: "JPEG",
            message: e.to_string(),
        })?;

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        quality,
        len = bytes.len(),
        "encoded JPEG"
    );
    Ok(bytes)
}

/// Raw RGBA8 payload handed to a system clipboard
///
/// Clipboard APIs take unencoded pixels, so this is the composited buffer
/// split into its dimensions and bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width * height * 4` bytes
    pub bytes: Vec<u8>,
}

impl ClipboardImage {
    /// Takes ownership of an RGBA buffer.
    #[must_use]
    pub fn from_image(image: Image<Rgba<u8>>) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            bytes: image.into_raw(),
        }
    }

    /// Rebuilds the RGBA buffer.
    ///
    /// # Errors
    ///
    /// * `ExportError::ImageBufferCreationFailed` - When the byte length does not match the dimensions
    pub fn to_image(&self) -> Result<Image<Rgba<u8>>, ExportError> {
        Image::from_raw(self.width, self.height, self.bytes.clone())
            .ok_or(ExportError::ImageBufferCreationFailed)
    }
}
