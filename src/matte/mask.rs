use image::Luma;
use imageproc::definitions::Image;

use crate::error::AlphaMaskError;
use crate::utils::validate_matching_dimensions;

/// Single channel opacity map aligned with the source image.
///
/// 0 is fully background (transparent), 255 is fully foreground (opaque).
pub type AlphaMask = Image<Luma<u8>>;

/// Mask value meaning "nothing removed yet".
pub const OPAQUE: u8 = 255;

/// Creates an empty mask: fully opaque everywhere.
///
/// # Examples
///
/// ```
/// use imageops_matte::empty_mask;
///
/// let mask = empty_mask(4, 3);
/// assert_eq!(mask.dimensions(), (4, 3));
/// assert!(mask.pixels().all(|p| p[0] == 255));
/// ```
#[must_use]
pub fn empty_mask(width: u32, height: u32) -> AlphaMask {
    AlphaMask::from_pixel(width, height, Luma([OPAQUE]))
}

/// Operations on the live mask layer.
pub trait MaskLayer {
    /// Clears the mask back to fully opaque.
    fn clear_to_opaque(&mut self);

    /// Overwrites this mask with the content of `other`.
    ///
    /// # Errors
    ///
    /// * `AlphaMaskError::DimensionMismatch` - When the two masks differ in size
    fn copy_from_mask(&mut self, other: &AlphaMask) -> Result<(), AlphaMaskError>;

    /// Number of pixels with a non-zero value.
    fn count_nonzero(&self) -> usize;
}

impl MaskLayer for AlphaMask {
    fn clear_to_opaque(&mut self) {
        self.iter_mut().for_each(|value| *value = OPAQUE);
    }

    fn copy_from_mask(&mut self, other: &AlphaMask) -> Result<(), AlphaMaskError> {
        let (width, height) = self.dimensions();
        let (other_width, other_height) = other.dimensions();
        validate_matching_dimensions(width, height, other_width, other_height, "MaskLayer")
            .map_err(|_| AlphaMaskError::DimensionMismatch {
                expected: (width, height),
                actual: (other_width, other_height),
            })?;

        self.copy_from_slice(other.as_raw());
        Ok(())
    }

    fn count_nonzero(&self) -> usize {
        self.iter().filter(|&&value| value > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_is_fully_opaque() {
        let mask = empty_mask(3, 2);
        assert_eq!(mask.dimensions(), (3, 2));
        assert_eq!(mask.count_nonzero(), 6);
        assert!(mask.iter().all(|&v| v == OPAQUE));
    }

    #[test]
    fn clear_to_opaque_resets_values() {
        let mut mask = AlphaMask::new(2, 2);
        mask.put_pixel(1, 1, Luma([17]));
        mask.clear_to_opaque();
        assert_eq!(mask, empty_mask(2, 2));
    }

    #[test]
    fn copy_from_mask_rejects_other_sizes() {
        let mut mask = empty_mask(2, 2);
        let other = AlphaMask::new(3, 2);

        assert_eq!(
            mask.copy_from_mask(&other),
            Err(AlphaMaskError::DimensionMismatch {
                expected: (2, 2),
                actual: (3, 2),
            })
        );
        assert_eq!(mask, empty_mask(2, 2));
    }

    #[test]
    fn copy_from_mask_copies_content() {
        let mut mask = empty_mask(2, 1);
        let mut other = AlphaMask::new(2, 1);
        other.put_pixel(0, 0, Luma([9]));

        mask.copy_from_mask(&other).unwrap();
        assert_eq!(mask.as_raw(), &vec![9, 0]);
        assert_eq!(mask.count_nonzero(), 1);
    }
}
