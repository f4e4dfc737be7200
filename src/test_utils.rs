//! Test utilities for imageops-matte
//!
//! This module provides shared fixtures for the unit tests.
//! It is only compiled when running tests.

use image::{Luma, Rgba};
use imageproc::definitions::Image;

/// Creates a test RGBA image with predefined pixel values for testing.
///
/// This function creates a 2x2 test image with known pixel values including alpha:
/// - (0,0): [200, 150, 100, 255] (opaque)
/// - (1,0): [100, 200, 150, 128] (semi-transparent)
/// - (0,1): [150, 100, 200, 64]  (more transparent)
/// - (1,1): [50, 75, 25, 0]      (fully transparent)
///
/// # Returns
/// A 2x2 RGBA image with u8 subpixels
pub fn create_test_rgba_image() -> Image<Rgba<u8>> {
    let mut image: Image<Rgba<u8>> = Image::new(2, 2);
    image.put_pixel(0, 0, Rgba([200, 150, 100, 255]));
    image.put_pixel(1, 0, Rgba([100, 200, 150, 128]));
    image.put_pixel(0, 1, Rgba([150, 100, 200, 64]));
    image.put_pixel(1, 1, Rgba([50, 75, 25, 0]));
    image
}

/// Creates a test alpha mask with predefined values for testing.
///
/// - (0,0): [255] (fully opaque)
/// - (1,0): [192] (mostly opaque)
/// - (0,1): [128] (semi-transparent)
/// - (1,1): [64]  (mostly transparent)
///
/// # Returns
/// A 2x2 mask matching [`create_test_rgba_image`]
pub fn create_test_alpha_mask() -> Image<Luma<u8>> {
    let mut mask: Image<Luma<u8>> = Image::new(2, 2);
    mask.put_pixel(0, 0, Luma([255]));
    mask.put_pixel(1, 0, Luma([192]));
    mask.put_pixel(0, 1, Luma([128]));
    mask.put_pixel(1, 1, Luma([64]));
    mask
}

/// Creates an opaque image with a deterministic, non-repeating color pattern.
///
/// Neighboring pixels differ in every channel, which gives the gradient and
/// blur stages something to work on.
///
/// # Arguments
/// * `width` - Width of the image to create
/// * `height` - Height of the image to create
pub fn create_pattern_rgba_image(width: u32, height: u32) -> Image<Rgba<u8>> {
    Image::from_fn(width, height, |x, y| {
        let red = (x * 37 + y * 11) % 256;
        let green = (x * 13 + y * 53 + 40) % 256;
        let blue = ((x ^ y) * 29 + 90) % 256;
        Rgba([red as u8, green as u8, blue as u8, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_test_rgba_image_with_valid_input_creates_image() {
        let image = create_test_rgba_image();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0), &Rgba([200, 150, 100, 255]));
        assert_eq!(image.get_pixel(1, 1), &Rgba([50, 75, 25, 0]));
    }

    #[test]
    fn create_test_alpha_mask_with_valid_input_creates_mask() {
        let mask = create_test_alpha_mask();
        assert_eq!(mask.as_raw(), &vec![255, 192, 128, 64]);
    }

    #[test]
    fn create_pattern_rgba_image_is_opaque_and_varied() {
        let image = create_pattern_rgba_image(8, 8);
        assert!(image.pixels().all(|p| p[3] == 255));
        assert_ne!(image.get_pixel(0, 0), image.get_pixel(1, 0));
        assert_ne!(image.get_pixel(0, 0), image.get_pixel(0, 1));
    }
}
