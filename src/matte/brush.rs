use image::Luma;
use itertools::iproduct;

use crate::matte::mask::AlphaMask;
use crate::utils::round_to_u8;

/// How a brush stamp changes the mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrushMode {
    /// Paint opacity back in (over composite of a white disk)
    Restore,
    /// Punch opacity out (destination-out)
    Erase,
}

/// Parameters of a single brush stamp
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrushState {
    /// Radius in mask pixels; values `<= 0` make every stamp a no-op
    pub radius: f32,
    /// Opacity at the stamp center, in percent `[0, 100]`
    pub hardness: u8,
    /// Restore or erase
    pub mode: BrushMode,
}

impl BrushState {
    /// Largest accepted hardness.
    pub const MAX_HARDNESS: u8 = 100;

    /// Creates a brush, clamping hardness to `[0, 100]` and radius to `>= 0`.
    #[must_use]
    pub fn new(radius: f32, hardness: u8, mode: BrushMode) -> Self {
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        Self {
            radius,
            hardness: hardness.min(Self::MAX_HARDNESS),
            mode,
        }
    }

    /// Opacity at the stamp center, in `[0, 1]`.
    #[must_use]
    pub fn peak_opacity(&self) -> f64 {
        f64::from(self.hardness.min(Self::MAX_HARDNESS)) / 100.0
    }

    /// Highest mask value a restore stamp can produce.
    #[must_use]
    pub fn ceiling(&self) -> f64 {
        255.0 * self.peak_opacity()
    }

    /// Stamp opacity at `distance` from the center.
    ///
    /// Linear from [`peak_opacity`](Self::peak_opacity) at the center to 0 at the radius.
    #[must_use]
    pub fn opacity_at(&self, distance: f64) -> f64 {
        let radius = f64::from(self.radius);
        if !(radius > 0.0) || distance >= radius {
            return 0.0;
        }
        self.peak_opacity() * (1.0 - distance / radius)
    }
}

impl Default for BrushState {
    fn default() -> Self {
        Self {
            radius: 20.0,
            hardness: 70,
            mode: BrushMode::Erase,
        }
    }
}

/// Trait providing brush editing on a mask layer
pub trait ApplyBrush {
    /// Applies one radial stamp centered at `(x, y)` in mask coordinates.
    ///
    /// Pixels are sampled at their centers. Pixels at or beyond the radius are
    /// untouched, as are stamps that fall completely outside the mask.
    ///
    /// # Examples
    ///
    /// ```
    /// use imageops_matte::{empty_mask, ApplyBrush, BrushMode, BrushState};
    ///
    /// let mut mask = empty_mask(16, 16);
    /// mask.apply_brush(8.0, 8.0, &BrushState::new(4.0, 100, BrushMode::Erase));
    /// assert!(mask.get_pixel(8, 8)[0] < 255);
    /// assert_eq!(mask.get_pixel(0, 0)[0], 255);
    /// ```
    fn apply_brush(&mut self, x: f32, y: f32, brush: &BrushState);
}

impl ApplyBrush for AlphaMask {
    fn apply_brush(&mut self, x: f32, y: f32, brush: &BrushState) {
        let radius = f64::from(brush.radius);
        if !(radius > 0.0) || !x.is_finite() || !y.is_finite() {
            return;
        }

        let (width, height) = self.dimensions();
        let (cx, cy) = (f64::from(x), f64::from(y));
        let left = (cx - radius).floor().max(0.0) as u32;
        let top = (cy - radius).floor().max(0.0) as u32;
        let right = (cx + radius).ceil().min(f64::from(width)).max(0.0) as u32;
        let bottom = (cy + radius).ceil().min(f64::from(height)).max(0.0) as u32;

        let ceiling = brush.ceiling();

        for (py, px) in iproduct!(top..bottom, left..right) {
            let dx = f64::from(px) + 0.5 - cx;
            let dy = f64::from(py) + 0.5 - cy;
            let alpha = brush.opacity_at((dx * dx + dy * dy).sqrt());
            if alpha <= 0.0 {
                continue;
            }

            let Luma([current]) = *self.get_pixel(px, py);
            let updated = match brush.mode {
                BrushMode::Restore => restore_over(current, alpha, ceiling),
                BrushMode::Erase => erase_out(current, alpha),
            };
            self.put_pixel(px, py, Luma([updated]));
        }
    }
}

/// Source-over of white at `alpha`, capped at the brush ceiling.
///
/// Values already at or above the ceiling are left as they are, so a restore
/// never lowers the mask.
fn restore_over(current: u8, alpha: f64, ceiling: f64) -> u8 {
    let current_f = f64::from(current);
    if current_f >= ceiling {
        return current;
    }
    let over = 255.0 * alpha + current_f * (1.0 - alpha);
    round_to_u8(over).min(ceiling.floor() as u8)
}

/// Destination-out: the stamp alpha is removed proportionally.
fn erase_out(current: u8, alpha: f64) -> u8 {
    round_to_u8(f64::from(current) * (1.0 - alpha))
}

/// A continuous stroke: stamps interpolated along the pointer path
///
/// Successive pointer positions may be far apart when the pointer moves fast;
/// the stroke fills the gap with stamps spaced a quarter radius apart.
#[derive(Debug, Clone)]
pub struct BrushStroke {
    brush: BrushState,
    last: Option<(f32, f32)>,
    stamps: usize,
}

impl BrushStroke {
    /// Starts an empty stroke.
    #[must_use]
    pub fn new(brush: BrushState) -> Self {
        Self {
            brush,
            last: None,
            stamps: 0,
        }
    }

    /// Brush used by this stroke.
    #[must_use]
    pub const fn brush(&self) -> &BrushState {
        &self.brush
    }

    /// Number of stamps applied so far.
    #[must_use]
    pub const fn stamps(&self) -> usize {
        self.stamps
    }

    /// Extends the stroke to `(x, y)`.
    ///
    /// The first call stamps once at `(x, y)`. Later calls stamp along the
    /// segment from the previous position, ending exactly at `(x, y)`.
    ///
    /// Only the part of the segment within one radius of the mask is stamped,
    /// so far-off pointer positions cost no more than a stroke across the mask.
    pub fn stamp_to(&mut self, mask: &mut AlphaMask, x: f32, y: f32) {
        let Some((last_x, last_y)) = self.last else {
            self.stamp(mask, x, y);
            return;
        };
        if !x.is_finite() || !y.is_finite() {
            return;
        }

        let (from, to) = (
            (f64::from(last_x), f64::from(last_y)),
            (f64::from(x), f64::from(y)),
        );
        let delta = (to.0 - from.0, to.1 - from.1);
        let reach = f64::from(self.brush.radius.max(0.0));
        let (width, height) = (f64::from(mask.width()), f64::from(mask.height()));
        let Some((enter, leave)) = clip_segment(
            from,
            delta,
            (-reach, -reach),
            (width + reach, height + reach),
        ) else {
            self.last = Some((x, y));
            return;
        };

        let distance = delta.0.hypot(delta.1) * (leave - enter);
        let spacing = f64::from((self.brush.radius / 4.0).max(1.0));
        let steps = (distance / spacing).ceil().max(1.0) as u32;

        for step in 1..=steps {
            if step == steps && leave >= 1.0 {
                self.stamp(mask, x, y);
                break;
            }
            let t = enter + (leave - enter) * (f64::from(step) / f64::from(steps));
            self.stamp(
                mask,
                (from.0 + delta.0 * t) as f32,
                (from.1 + delta.1 * t) as f32,
            );
        }
        self.last = Some((x, y));
    }

    fn stamp(&mut self, mask: &mut AlphaMask, x: f32, y: f32) {
        mask.apply_brush(x, y, &self.brush);
        self.last = Some((x, y));
        self.stamps += 1;
    }
}

/// Parameter range `(enter, leave)` within `0..=1` of the segment
/// `start + t * delta` that lies inside the rectangle `min..=max`, or `None`
/// when the segment misses it (Liang-Barsky).
fn clip_segment(
    start: (f64, f64),
    delta: (f64, f64),
    min: (f64, f64),
    max: (f64, f64),
) -> Option<(f64, f64)> {
    let (mut enter, mut leave) = (0.0f64, 1.0f64);
    let edges = [
        (-delta.0, start.0 - min.0),
        (delta.0, max.0 - start.0),
        (-delta.1, start.1 - min.1),
        (delta.1, max.1 - start.1),
    ];

    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            enter = enter.max(t);
        } else {
            leave = leave.min(t);
        }
        if enter > leave {
            return None;
        }
    }

    Some((enter, leave))
}
