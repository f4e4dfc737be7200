//! Compositing the cut-out foreground over a backdrop
//!
//! The foreground is always the original color with the mask as alpha. What
//! sits underneath is chosen per render by [`Backdrop`]; the mask itself is
//! never modified here.
//!
//! ```text
//! out.rgb = fg.rgb * α + backdrop.rgb * (1 - α)     α = mask / 255
//! ```

use image::{Rgb, Rgba};
use imageproc::definitions::Image;

use crate::error::{AlphaMaskError, Error};
use crate::matte::apply_alpha_mask::ModifyAlpha;
use crate::matte::box_filter::BoxBlur;
use crate::matte::mask::AlphaMask;
use crate::utils::{normalize_alpha, round_to_u8};

/// Edge length of a checkerboard square in pixels.
pub const CHECKER_SIZE: u32 = 10;
/// Checkerboard colors, even squares first.
pub const CHECKER_COLORS: [Rgb<u8>; 2] = [Rgb([0x2a, 0x2a, 0x2a]), Rgb([0x1a, 0x1a, 0x1a])];

/// Content drawn beneath the masked foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backdrop {
    /// Nothing: the output keeps the mask as its alpha channel
    #[default]
    Transparent,
    /// A flat opaque color
    Solid(Rgb<u8>),
    /// The original image box-blurred with the given radius
    Blurred {
        /// Box radius in pixels
        radius: u32,
    },
}

/// Trait providing backdrop compositing for RGBA images
pub trait Composite {
    /// Renders the image with `mask` as alpha over `backdrop`.
    ///
    /// `Transparent` keeps the mask as output alpha; the other backdrops
    /// produce a fully opaque result. The blurred backdrop is computed from
    /// this image, never from the masked result.
    ///
    /// # Errors
    ///
    /// * `AlphaMaskError::DimensionMismatch` - When image and mask dimensions don't match
    ///
    /// # Examples
    ///
    /// ```
    /// use imageops_matte::{Backdrop, Composite, Image};
    /// use image::{Luma, Rgb, Rgba};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let image: Image<Rgba<u8>> = Image::from_pixel(2, 2, Rgba([200, 0, 0, 255]));
    /// let mask: Image<Luma<u8>> = Image::from_pixel(2, 2, Luma([0]));
    ///
    /// let out = image.composite(&mask, &Backdrop::Solid(Rgb([0, 0, 255])))?;
    /// assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    fn composite(
        &self,
        mask: &AlphaMask,
        backdrop: &Backdrop,
    ) -> Result<Image<Rgba<u8>>, AlphaMaskError>;

    /// Renders an opaque display buffer.
    ///
    /// Same as [`composite`](Self::composite), except that a transparent
    /// backdrop is shown as a checkerboard. Only meant for on-screen preview.
    ///
    /// # Errors
    ///
    /// * `AlphaMaskError::DimensionMismatch` - When image and mask dimensions don't match
    fn preview(&self, mask: &AlphaMask, backdrop: &Backdrop)
        -> Result<Image<Rgb<u8>>, AlphaMaskError>;
}

impl Composite for Image<Rgba<u8>> {
    fn composite(
        &self,
        mask: &AlphaMask,
        backdrop: &Backdrop,
    ) -> Result<Image<Rgba<u8>>, AlphaMaskError> {
        let foreground = self.replace_alpha(mask)?;

        let output = match backdrop {
            Backdrop::Transparent => foreground,
            Backdrop::Solid(color) => over_backdrop(&foreground, |_, _| *color),
            Backdrop::Blurred { radius } => {
                let blurred = self.box_blur_clamped(*radius);
                over_backdrop(&foreground, |x, y| *blurred.get_pixel(x, y))
            }
        };

        Ok(output)
    }

    fn preview(
        &self,
        mask: &AlphaMask,
        backdrop: &Backdrop,
    ) -> Result<Image<Rgb<u8>>, AlphaMaskError> {
        let composed = self.composite(mask, backdrop)?;
        let flattened = over_backdrop(&composed, checker_color);
        Ok(drop_alpha(&flattened))
    }
}

/// Flattens the original image onto a solid color for formats without alpha.
///
/// The mask and any blur backdrop are ignored on purpose: the result is the
/// original picture over `color`, which for an opaque source is the source itself.
#[must_use]
pub fn flatten_onto(image: &Image<Rgba<u8>>, color: Rgb<u8>) -> Image<Rgb<u8>> {
    drop_alpha(&over_backdrop(image, |_, _| color))
}

/// Display-only checkerboard used to visualize transparency.
#[must_use]
pub fn checkerboard(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, checker_color)
}

/// Parses `#rrggbb`, `rrggbb` or `#rgb` into a color.
///
/// # Errors
///
/// * `Error::InvalidColor` - When the text is not one of the accepted forms
///
/// # Examples
///
/// ```
/// use imageops_matte::parse_hex_color;
/// use image::Rgb;
///
/// assert_eq!(parse_hex_color("#112233").unwrap(), Rgb([0x11, 0x22, 0x33]));
/// assert_eq!(parse_hex_color("#fff").unwrap(), Rgb([255, 255, 255]));
/// assert!(parse_hex_color("#12345").is_err());
/// ```
pub fn parse_hex_color(text: &str) -> Result<Rgb<u8>, Error> {
    let invalid = || Error::InvalidColor(text.to_owned());

    let trimmed = text.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let digits: String = match hex.len() {
        6 => hex.to_owned(),
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        _ => return Err(invalid()),
    };

    let channel = |offset: usize| {
        u8::from_str_radix(&digits[offset..offset + 2], 16).map_err(|_| invalid())
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Formats a color as lowercase `#rrggbb`.
#[must_use]
pub fn format_hex_color(color: Rgb<u8>) -> String {
    let Rgb([red, green, blue]) = color;
    format!("#{red:02x}{green:02x}{blue:02x}")
}

fn checker_color(x: u32, y: u32) -> Rgb<u8> {
    CHECKER_COLORS[((x / CHECKER_SIZE + y / CHECKER_SIZE) % 2) as usize]
}

fn over_backdrop<F>(foreground: &Image<Rgba<u8>>, backdrop: F) -> Image<Rgba<u8>>
where
    F: Fn(u32, u32) -> Rgb<u8>,
{
    Image::from_fn(foreground.width(), foreground.height(), |x, y| {
        let Rgba([red, green, blue, alpha]) = *foreground.get_pixel(x, y);
        let Rgb([back_red, back_green, back_blue]) = backdrop(x, y);
        let alpha = normalize_alpha(alpha);
        let mix = |front: u8, back: u8| {
            round_to_u8(f64::from(front) * alpha + f64::from(back) * (1.0 - alpha))
        };
        Rgba([
            mix(red, back_red),
            mix(green, back_green),
            mix(blue, back_blue),
            u8::MAX,
        ])
    })
}

fn drop_alpha(image: &Image<Rgba<u8>>) -> Image<Rgb<u8>> {
    Image::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([red, green, blue, _]) = *image.get_pixel(x, y);
        Rgb([red, green, blue])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matte::mask::empty_mask;
    use crate::test_utils::{create_pattern_rgba_image, create_test_alpha_mask, create_test_rgba_image};
    use image::Luma;

    #[test]
    fn transparent_backdrop_copies_mask_into_alpha() {
        let image = create_test_rgba_image();
        let mask = create_test_alpha_mask();

        let out = image.composite(&mask, &Backdrop::Transparent).unwrap();
        assert_eq!(out.get_pixel(1, 0), &Rgba([100, 200, 150, 192]));
        assert_eq!(out.get_pixel(1, 1), &Rgba([50, 75, 25, 64]));
    }

    #[test]
    fn solid_backdrop_blends_by_mask() {
        let image: Image<Rgba<u8>> = Image::from_pixel(1, 3, Rgba([200, 100, 0, 255]));
        let mut mask = AlphaMask::new(1, 3);
        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(0, 1, Luma([0]));
        mask.put_pixel(0, 2, Luma([51]));

        let out = image
            .composite(&mask, &Backdrop::Solid(Rgb([0, 0, 250])))
            .unwrap();

        assert_eq!(out.get_pixel(0, 0), &Rgba([200, 100, 0, 255]));
        assert_eq!(out.get_pixel(0, 1), &Rgba([0, 0, 250, 255]));
        // 20% foreground: 200*0.2 = 40, 100*0.2 = 20, 250*0.8 = 200
        assert_eq!(out.get_pixel(0, 2), &Rgba([40, 20, 200, 255]));
    }

    #[test]
    fn blurred_backdrop_uses_original_image() {
        let image = create_pattern_rgba_image(6, 6);
        let mask = AlphaMask::new(6, 6);

        let out = image
            .composite(&mask, &Backdrop::Blurred { radius: 2 })
            .unwrap();
        let blurred = image.box_blur_clamped(2);

        for (x, y, pixel) in out.enumerate_pixels() {
            let Rgb([r, g, b]) = *blurred.get_pixel(x, y);
            assert_eq!(pixel, &Rgba([r, g, b, 255]));
        }
    }

    #[test]
    fn opaque_mask_hides_any_backdrop() {
        let image = create_pattern_rgba_image(5, 4);
        let mask = empty_mask(5, 4);

        for backdrop in [
            Backdrop::Solid(Rgb([1, 2, 3])),
            Backdrop::Blurred { radius: 3 },
        ] {
            let out = image.composite(&mask, &backdrop).unwrap();
            for (src, dst) in image.pixels().zip(out.pixels()) {
                assert_eq!(&src.0[..3], &dst.0[..3]);
                assert_eq!(dst[3], 255);
            }
        }
    }

    #[test]
    fn composite_rejects_mismatched_mask() {
        let image = create_test_rgba_image();
        let mask = AlphaMask::new(4, 4);
        assert_eq!(
            image.composite(&mask, &Backdrop::Transparent),
            Err(AlphaMaskError::DimensionMismatch {
                expected: (2, 2),
                actual: (4, 4),
            })
        );
    }

    #[test]
    fn preview_shows_checkerboard_where_transparent() {
        let image: Image<Rgba<u8>> = Image::from_pixel(20, 10, Rgba([255, 255, 255, 255]));
        let mask = AlphaMask::new(20, 10);

        let preview = image.preview(&mask, &Backdrop::Transparent).unwrap();
        assert_eq!(preview, checkerboard(20, 10));
        assert_eq!(preview.get_pixel(0, 0), &CHECKER_COLORS[0]);
        assert_eq!(preview.get_pixel(10, 0), &CHECKER_COLORS[1]);
    }

    #[test]
    fn flatten_blends_source_alpha_over_color() {
        let image = create_test_rgba_image();
        let flat = flatten_onto(&image, Rgb([0x11, 0x22, 0x33]));

        assert_eq!(flat.get_pixel(0, 0), &Rgb([200, 150, 100]));
        assert_eq!(flat.get_pixel(1, 1), &Rgb([0x11, 0x22, 0x33]));
    }

    #[test]
    fn hex_colors_round_trip() {
        assert_eq!(parse_hex_color("#112233").unwrap(), Rgb([0x11, 0x22, 0x33]));
        assert_eq!(parse_hex_color("  AABBCC ").unwrap(), Rgb([0xaa, 0xbb, 0xcc]));
        assert_eq!(parse_hex_color("#0f8").unwrap(), Rgb([0x00, 0xff, 0x88]));
        assert_eq!(format_hex_color(Rgb([0x11, 0x22, 0x33])), "#112233");

        for bad in ["", "#", "#12", "#1234567", "#gg0000", "#ééé"] {
            assert_eq!(
                parse_hex_color(bad),
                Err(Error::InvalidColor(bad.to_owned()))
            );
        }
    }
}
