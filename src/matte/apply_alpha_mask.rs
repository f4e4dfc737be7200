use image::{GenericImageView, Luma, Pixel, Primitive, Rgba};
use imageproc::{definitions::Image, map::map_colors2};

use crate::{error::AlphaMaskError, utils::validate_matching_dimensions};

/// Trait for swapping the alpha channel of RGBA images for a mask
///
/// The color channels are never touched: the mask value becomes the new alpha
/// verbatim. This is how a matte is "applied" to pixel data.
pub trait ModifyAlpha {
    type Mask: GenericImageView<Pixel = Luma<Self::Subpixel>>;
    type Subpixel: Primitive;

    /// Returns a copy of the image whose alpha channel is `mask`.
    ///
    /// # Errors
    ///
    /// * `AlphaMaskError::DimensionMismatch` - When image and mask dimensions don't match
    ///
    /// # Examples
    ///
    /// ```
    /// use imageops_matte::{Image, ModifyAlpha};
    /// use image::{Luma, Rgba};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let image: Image<Rgba<u8>> = Image::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
    /// let mask: Image<Luma<u8>> = Image::from_pixel(2, 2, Luma([64]));
    ///
    /// let cut = image.replace_alpha(&mask)?;
    /// assert_eq!(cut.get_pixel(1, 1), &Rgba([10, 20, 30, 64]));
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    fn replace_alpha(&self, mask: &Self::Mask) -> Result<Self, AlphaMaskError>
    where
        Self: Sized;

    /// Replaces the alpha channel with `mask` in place.
    ///
    /// # Errors
    ///
    /// * `AlphaMaskError::DimensionMismatch` - When image and mask dimensions don't match
    fn replace_alpha_mut(&mut self, mask: &Self::Mask) -> Result<&mut Self, AlphaMaskError>;
}

impl ModifyAlpha for Image<Rgba<u8>> {
    type Mask = Image<Luma<u8>>;
    type Subpixel = u8;

    fn replace_alpha(&self, mask: &Self::Mask) -> Result<Self, AlphaMaskError> {
        validate_dimensions(self, mask)?;

        let result = map_colors2(self, mask, |Rgba([red, green, blue, _]), Luma([alpha])| {
            Rgba([red, green, blue, alpha])
        });

        Ok(result)
    }

    fn replace_alpha_mut(&mut self, mask: &Self::Mask) -> Result<&mut Self, AlphaMaskError> {
        validate_dimensions(self, mask)?;

        self.pixels_mut()
            .zip(mask.pixels())
            .for_each(|(pixel, Luma([alpha]))| pixel[3] = *alpha);

        Ok(self)
    }
}

#[inline]
fn validate_dimensions<I1, I2, P1, P2, S>(image: &I1, mask: &I2) -> Result<(), AlphaMaskError>
where
    I1: GenericImageView<Pixel = P1>,
    I2: GenericImageView<Pixel = P2>,
    P1: Pixel<Subpixel = S>,
    P2: Pixel<Subpixel = S>,
    S: Primitive,
{
    let (img_w, img_h) = image.dimensions();
    let (mask_w, mask_h) = mask.dimensions();

    validate_matching_dimensions(img_w, img_h, mask_w, mask_h, "ModifyAlpha").map_err(|_| {
        AlphaMaskError::DimensionMismatch {
            expected: (img_w, img_h),
            actual: (mask_w, mask_h),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_alpha_mask, create_test_rgba_image};

    #[test]
    fn test_validate_dimensions() {
        let image: Image<Rgba<u8>> = Image::new(10, 10);
        let mask: Image<Luma<u8>> = Image::new(10, 10);

        assert!(validate_dimensions(&image, &mask).is_ok());

        let mask_wrong_size: Image<Luma<u8>> = Image::new(5, 5);
        assert_eq!(
            validate_dimensions(&image, &mask_wrong_size),
            Err(AlphaMaskError::DimensionMismatch {
                expected: (10, 10),
                actual: (5, 5),
            })
        );
    }

    #[test]
    fn test_replace_alpha() {
        let image = create_test_rgba_image();
        let mask = create_test_alpha_mask();

        let result = image.replace_alpha(&mask).unwrap();

        // Color channels should remain unchanged, only alpha is replaced
        assert_eq!(result.get_pixel(0, 0), &Rgba([200, 150, 100, 255]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([100, 200, 150, 192]));
        assert_eq!(result.get_pixel(0, 1), &Rgba([150, 100, 200, 128]));
        assert_eq!(result.get_pixel(1, 1), &Rgba([50, 75, 25, 64]));
    }

    #[test]
    fn test_replace_alpha_mut() {
        let mut image = create_test_rgba_image();
        let mask = create_test_alpha_mask();

        image.replace_alpha_mut(&mask).unwrap();

        assert_eq!(image, create_test_rgba_image().replace_alpha(&mask).unwrap());
        assert_eq!(image.get_pixel(1, 1), &Rgba([50, 75, 25, 64]));
    }

    #[test]
    fn test_replace_alpha_mut_rejects_mismatch() {
        let mut image = create_test_rgba_image();
        let original = image.clone();
        let mask: Image<Luma<u8>> = Image::new(3, 2);

        assert!(image.replace_alpha_mut(&mask).is_err());
        assert_eq!(image, original);
    }
}
