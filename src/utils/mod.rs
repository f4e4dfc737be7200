//! Internal utility functions for imageops-matte.
//!
//! This module contains common functionality used across the matte pipeline.

/// Rounds a floating-point value to the nearest `u8`, ties to even, saturating at 0 and 255.
///
/// Every stage of the pipeline stores its intermediate map as bytes through this
/// function, so the rounding rule must stay the same everywhere.
///
/// # Arguments
///
/// * `value` - The value to quantize
///
/// # Returns
///
/// The clamped and rounded byte. `NaN` maps to 0.
#[inline]
pub fn round_to_u8(value: f64) -> u8 {
    // `as` saturates and maps NaN to zero.
    value.round_ties_even() as u8
}

/// Normalizes an 8-bit alpha value to the range [0, 1].
#[inline]
pub fn normalize_alpha(alpha: u8) -> f64 {
    f64::from(alpha) / 255.0
}

/// Validates that an image has non-zero dimensions.
///
/// # Arguments
///
/// * `width` - The width of the image
/// * `height` - The height of the image
/// * `context` - A description of the context for error messages
///
/// # Returns
///
/// `Ok(())` if the dimensions are valid, otherwise an error
pub fn validate_non_empty_image(width: u32, height: u32, context: &str) -> Result<(), String> {
    if width == 0 || height == 0 {
        Err(format!("{}: Image dimensions must be non-zero", context))
    } else {
        Ok(())
    }
}

/// Validates that two images have matching dimensions.
///
/// # Arguments
///
/// * `width1` - The width of the first image
/// * `height1` - The height of the first image
/// * `width2` - The width of the second image
/// * `height2` - The height of the second image
/// * `context` - A description of the context for error messages
///
/// # Returns
///
/// `Ok(())` if the dimensions match, otherwise an error
pub fn validate_matching_dimensions(
    width1: u32,
    height1: u32,
    width2: u32,
    height2: u32,
    context: &str,
) -> Result<(), String> {
    if width1 != width2 || height1 != height2 {
        Err(format!(
            "{}: Image dimensions must match. Got {}x{} and {}x{}",
            context, width1, height1, width2, height2
        ))
    } else {
        Ok(())
    }
}
