use image::{Rgb, Rgba};
use imageproc::definitions::Image;

use crate::matte::summed_area_table::SummedAreaTable;
use crate::utils::round_to_u8;

/// Trait providing a clamped-edge box blur backed by summed-area tables
///
/// Every output pixel is the mean of the `(2r+1)²` samples around it, with
/// sample coordinates clamped to the image bounds. Near the edges the border
/// pixels are counted several times instead of the window shrinking.
///
/// Because the sums come from integral images, the cost per pixel does not
/// depend on the radius.
pub trait BoxBlur {
    /// Filtered output type
    type Output;

    /// Blurs the color channels with a square window of the given radius.
    ///
    /// A radius of 0 copies the color channels unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use imageops_matte::{BoxBlur, Image};
    /// use image::{Rgb, Rgba};
    ///
    /// let image: Image<Rgba<u8>> = Image::from_pixel(5, 5, Rgba([10, 20, 30, 0]));
    /// let blurred = image.box_blur_clamped(2);
    /// assert_eq!(blurred.get_pixel(0, 0), &Rgb([10, 20, 30]));
    /// ```
    fn box_blur_clamped(&self, radius: u32) -> Self::Output;
}

impl BoxBlur for Image<Rgba<u8>> {
    type Output = Image<Rgb<u8>>;

    fn box_blur_clamped(&self, radius: u32) -> Self::Output {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return Image::new(width, height);
        }

        let channel = |index: usize| -> SummedAreaTable<u64> {
            let values: Vec<u64> = self.pixels().map(|p| u64::from(p.0[index])).collect();
            SummedAreaTable::from_data(&values, width, height)
        };
        let tables = [channel(0), channel(1), channel(2)];

        let side = 2 * u128::from(radius) + 1;
        let count = (side * side) as f64;

        Image::from_fn(width, height, |x, y| {
            let mean = |sat: &SummedAreaTable<u64>| {
                round_to_u8(sat.clamped_window_sum(x, y, radius) as f64 / count)
            };
            Rgb([mean(&tables[0]), mean(&tables[1]), mean(&tables[2])])
        })
    }
}
