//! Editor configuration surface
//!
//! Every user-facing knob of the editor in one plain struct. The typed
//! parameter sets used by the pipeline are derived from it on demand.

use crate::error::Error;
use crate::matte::brush::{BrushMode, BrushState};
use crate::matte::compositor::{parse_hex_color, Backdrop};
use crate::matte::export::DEFAULT_JPEG_QUALITY;
use crate::matte::segmentation::SegmentationParams;

/// Largest accepted brush radius in pixels.
pub const MAX_BRUSH_RADIUS: f32 = 100.0;
/// Smallest accepted brush radius in pixels.
pub const MIN_BRUSH_RADIUS: f32 = 1.0;
/// Largest accepted feather width in pixels.
pub const MAX_EDGE_FEATHER: f32 = 50.0;
/// Largest accepted backdrop blur radius in pixels.
pub const MAX_BLUR_RADIUS: u32 = 50;

/// Which kind of backdrop to render under the cut-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackdropMode {
    #[default]
    Transparent,
    Solid,
    Blurred,
}

/// User settings for one editing session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EditorConfig {
    /// Edge sensitivity, `0..=100`
    pub sensitivity: u8,
    /// Feather width in pixels
    pub edge_feather: f32,
    pub brush_radius: f32,
    /// Brush hardness, `0..=100`
    pub brush_hardness: u8,
    pub brush_mode: BrushMode,
    pub backdrop: BackdropMode,
    /// Hex color used by the solid backdrop and by JPEG flattening
    pub solid_color: String,
    pub blur_radius: u32,
    /// JPEG quality, `1..=100`
    pub jpeg_quality: u8,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            sensitivity: 70,
            edge_feather: 8.0,
            brush_radius: 20.0,
            brush_hardness: 70,
            brush_mode: BrushMode::Erase,
            backdrop: BackdropMode::Transparent,
            solid_color: "#ffffff".to_owned(),
            blur_radius: 10,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl EditorConfig {
    /// Returns a copy with every numeric field forced into its range.
    ///
    /// Non-finite floats fall back to their defaults. The color string is
    /// left alone; it is validated when the backdrop is built.
    ///
    /// # Examples
    ///
    /// ```
    /// use imageops_matte::EditorConfig;
    ///
    /// let config = EditorConfig {
    ///     sensitivity: 180,
    ///     brush_radius: 0.0,
    ///     ..EditorConfig::default()
    /// }
    /// .clamped();
    /// assert_eq!(config.sensitivity, 100);
    /// assert_eq!(config.brush_radius, 1.0);
    /// ```
    #[must_use]
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f32, fallback: f32| {
            if value.is_finite() {
                value
            } else {
                fallback
            }
        };

        Self {
            sensitivity: self.sensitivity.min(SegmentationParams::MAX_SENSITIVITY),
            edge_feather: finite_or(self.edge_feather, defaults.edge_feather)
                .clamp(0.0, MAX_EDGE_FEATHER),
            brush_radius: finite_or(self.brush_radius, defaults.brush_radius)
                .clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS),
            brush_hardness: self.brush_hardness.min(BrushState::MAX_HARDNESS),
            brush_mode: self.brush_mode,
            backdrop: self.backdrop,
            solid_color: self.solid_color.clone(),
            blur_radius: self.blur_radius.min(MAX_BLUR_RADIUS),
            jpeg_quality: self.jpeg_quality.clamp(1, 100),
        }
    }

    #[must_use]
    pub fn segmentation_params(&self) -> SegmentationParams {
        SegmentationParams::new(self.sensitivity, self.edge_feather)
    }

    #[must_use]
    pub fn brush(&self) -> BrushState {
        BrushState::new(self.brush_radius, self.brush_hardness, self.brush_mode)
    }

    /// Builds the backdrop for rendering.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidColor` - When the solid backdrop is selected and `solid_color` does not parse
    pub fn backdrop(&self) -> Result<Backdrop, Error> {
        Ok(match self.backdrop {
            BackdropMode::Transparent => Backdrop::Transparent,
            BackdropMode::Solid => Backdrop::Solid(parse_hex_color(&self.solid_color)?),
            BackdropMode::Blurred => Backdrop::Blurred {
                radius: self.blur_radius,
            },
        })
    }
}
