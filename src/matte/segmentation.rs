//! Automatic foreground matte estimation
//!
//! The engine turns an RGBA image into an [`AlphaMask`] with a fixed, purely
//! heuristic pipeline:
//!
//! 1. **Luma** with Rec. 601 weights
//! 2. **Sobel gradient magnitude** over the interior pixels
//! 3. **Classification** by gradient threshold or center prior
//! 4. **Dilation** with a 3×3 max filter to close small gaps
//! 5. **Feathering** with a normalized, separable 2D Gaussian
//!
//! Every stage stores its map as bytes, rounding half to even and clamping to
//! `[0, 255]`, so the output for a given input and parameter set is always
//! bit-identical.
//!
//! The result is a center-biased foreground likelihood, not a true
//! segmentation. It is a starting point for manual brush refinement.
//!
//! ## Usage Example
//!
//! ```rust
//! use imageops_matte::{Image, SegmentForeground, SegmentationParams};
//! use image::Rgba;
//!
//! let image: Image<Rgba<u8>> = Image::from_pixel(32, 32, Rgba([200, 120, 40, 255]));
//! let mask = image.segment_foreground(&SegmentationParams::default());
//! assert_eq!(mask.dimensions(), image.dimensions());
//! ```

use std::time::Instant;

use image::{ImageBuffer, Luma, Rgba};
use imageproc::definitions::Image;
use itertools::iproduct;

use crate::matte::mask::AlphaMask;
use crate::utils::round_to_u8;

/// Rec. 601 luma weights for R, G and B.
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Horizontal Sobel kernel, row-major.
pub const SOBEL_X: [f64; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];

/// Vertical Sobel kernel, row-major.
pub const SOBEL_Y: [f64; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

/// Maps sensitivity `[0, 100]` onto the byte range.
pub const SENSITIVITY_SCALE: f64 = 2.55;

/// Scale applied to the inverted sensitivity to obtain the gradient threshold.
pub const THRESHOLD_SCALE: f64 = 0.5;

/// Pixels whose center boost exceeds this value are foreground regardless of gradient.
pub const CENTER_PRIOR_THRESHOLD: f64 = 0.3;

/// Weight of the center boost added to the gradient of a foreground pixel.
pub const CENTER_PRIOR_GAIN: f64 = 100.0;

/// Parameters of a single segmentation run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentationParams {
    /// Edge sensitivity in `[0, 100]`; higher values lower the gradient threshold
    pub sensitivity: u8,
    /// Feather width in pixels, `>= 0`
    pub edge_feather: f32,
}

impl SegmentationParams {
    /// Largest accepted sensitivity.
    pub const MAX_SENSITIVITY: u8 = 100;

    /// Creates a parameter set, clamping both values into their valid range.
    ///
    /// # Examples
    ///
    /// ```
    /// use imageops_matte::SegmentationParams;
    ///
    /// let params = SegmentationParams::new(250, -3.0);
    /// assert_eq!(params.sensitivity, 100);
    /// assert_eq!(params.edge_feather, 0.0);
    /// ```
    #[must_use]
    pub fn new(sensitivity: u8, edge_feather: f32) -> Self {
        let edge_feather = if edge_feather.is_finite() {
            edge_feather.max(0.0)
        } else {
            0.0
        };
        Self {
            sensitivity: sensitivity.min(Self::MAX_SENSITIVITY),
            edge_feather,
        }
    }

    /// Gradient magnitude a pixel has to exceed to count as an edge.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        gradient_threshold(self.sensitivity)
    }
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            sensitivity: 70,
            edge_feather: 8.0,
        }
    }
}

/// Trait providing matte estimation for RGBA images
pub trait SegmentForeground {
    /// Estimates a foreground matte for this image.
    ///
    /// The returned mask always has the same dimensions as the image.
    fn segment_foreground(&self, params: &SegmentationParams) -> AlphaMask;
}

impl SegmentForeground for Image<Rgba<u8>> {
    fn segment_foreground(&self, params: &SegmentationParams) -> AlphaMask {
        segment(self, params)
    }
}

/// Runs the full pipeline on `image`.
///
/// Zero-area images yield a zero-area mask. Rejecting them is the caller's job.
pub fn segment(image: &Image<Rgba<u8>>, params: &SegmentationParams) -> AlphaMask {
    let (width, height) = image.dimensions();
    let started = Instant::now();

    let gray = luma(image);
    let gradient = sobel_magnitude(&gray, width, height);
    let classified = classify_foreground(&gradient, params.sensitivity);
    let dilated = dilate(&classified);
    let feathered = feather(&dilated, params.edge_feather);

    tracing::debug!(
        width,
        height,
        sensitivity = params.sensitivity,
        edge_feather = params.edge_feather,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "segmentation finished"
    );

    feathered
}

/// Per-pixel luma in row-major order.
pub fn luma(image: &Image<Rgba<u8>>) -> Vec<f64> {
    let [wr, wg, wb] = LUMA_WEIGHTS;
    image
        .pixels()
        .map(|&Rgba([red, green, blue, _])| {
            f64::from(red) * wr + f64::from(green) * wg + f64::from(blue) * wb
        })
        .collect()
}

/// Sobel gradient magnitude of a luma plane.
///
/// Only interior pixels are computed; the one pixel border stays 0.
///
/// # Arguments
///
/// * `gray` - Luma values in row-major order, `width * height` long
/// * `width` - Plane width
/// * `height` - Plane height
pub fn sobel_magnitude(gray: &[f64], width: u32, height: u32) -> AlphaMask {
    let mut gradient = AlphaMask::new(width, height);
    let (w, h) = (width as usize, height as usize);
    if w < 3 || h < 3 {
        return gradient;
    }

    for (y, x) in iproduct!(1..h - 1, 1..w - 1) {
        let (mut gx, mut gy) = (0.0, 0.0);
        for (ky, kx) in iproduct!(0..3, 0..3) {
            let value = gray[(y + ky - 1) * w + (x + kx - 1)];
            let k = ky * 3 + kx;
            gx += value * SOBEL_X[k];
            gy += value * SOBEL_Y[k];
        }
        let magnitude = (gx * gx + gy * gy).sqrt();
        gradient.put_pixel(x as u32, y as u32, Luma([round_to_u8(magnitude)]));
    }

    gradient
}

/// Gradient threshold for a sensitivity value. Monotonically decreasing.
#[must_use]
pub fn gradient_threshold(sensitivity: u8) -> f64 {
    (255.0 - f64::from(sensitivity) * SENSITIVITY_SCALE) * THRESHOLD_SCALE
}

/// Linear falloff from 1 at the image center to 0 at a distance of `max(width, height)`.
///
/// Distances are measured from pixel centers, so the prior is symmetric under
/// the image's own mirror and rotation symmetries.
#[must_use]
pub fn center_boost(x: u32, y: u32, width: u32, height: u32) -> f64 {
    let center_x = f64::from(width) / 2.0;
    let center_y = f64::from(height) / 2.0;
    let dx = f64::from(x) + 0.5 - center_x;
    let dy = f64::from(y) + 0.5 - center_y;
    let distance = (dx * dx + dy * dy).sqrt();
    (1.0 - distance / f64::from(width.max(height))).max(0.0)
}

/// Classifies gradient pixels into a foreground likelihood map.
///
/// A pixel is kept when its gradient exceeds the sensitivity threshold or its
/// center boost exceeds [`CENTER_PRIOR_THRESHOLD`]; kept pixels become
/// `min(255, gradient + boost * CENTER_PRIOR_GAIN)`, all others 0.
pub fn classify_foreground(gradient: &AlphaMask, sensitivity: u8) -> AlphaMask {
    let threshold = gradient_threshold(sensitivity);
    let (width, height) = gradient.dimensions();

    ImageBuffer::from_fn(width, height, |x, y| {
        let magnitude = f64::from(gradient.get_pixel(x, y)[0]);
        let boost = center_boost(x, y, width, height);

        if magnitude > threshold || boost > CENTER_PRIOR_THRESHOLD {
            Luma([round_to_u8(
                (magnitude + boost * CENTER_PRIOR_GAIN).min(255.0),
            )])
        } else {
            Luma([0])
        }
    })
}

/// 3×3 max filter over the interior; the border keeps its input value.
pub fn dilate(map: &AlphaMask) -> AlphaMask {
    let mut dilated = map.clone();
    let (width, height) = map.dimensions();
    if width < 3 || height < 3 {
        return dilated;
    }

    for (y, x) in iproduct!(1..height - 1, 1..width - 1) {
        let max = iproduct!(y - 1..=y + 1, x - 1..=x + 1)
            .map(|(ny, nx)| map.get_pixel(nx, ny)[0])
            .max()
            .unwrap_or(0);
        dilated.put_pixel(x, y, Luma([max]));
    }

    dilated
}

/// Widest feather honored; larger values smooth like this one.
pub const MAX_FEATHER_WIDTH: f32 = 65_536.0;

/// Normalized Gaussian smoothing with clamped-edge sampling.
///
/// `sigma = edge_feather / 2` and the window radius is `ceil(edge_feather)`.
/// A feather of 0 returns the input unchanged.
///
/// The 2D weight `exp(-(dx² + dy²) / 2σ²)` factors into a row and a column
/// kernel, so the map is smoothed horizontally and then vertically without
/// rounding in between. Samples past an edge fold onto the edge pixel, which
/// keeps the work per pixel bounded by the image size for wide feathers.
pub fn feather(map: &AlphaMask, edge_feather: f32) -> AlphaMask {
    feather_rows(map, edge_feather, cfg!(feature = "rayon"))
}

fn feather_rows(map: &AlphaMask, edge_feather: f32, parallel: bool) -> AlphaMask {
    let (width, height) = map.dimensions();
    if !(edge_feather > 0.0) || width == 0 || height == 0 {
        return map.clone();
    }

    let edge_feather = f64::from(edge_feather.min(MAX_FEATHER_WIDTH));
    let kernel = ClampedGaussian::new(edge_feather.ceil() as i64, edge_feather / 2.0);
    let (w, h) = (width as usize, height as usize);
    let source = map.as_raw();

    let mut horizontal = vec![0.0f64; w * h];
    for_each_row(&mut horizontal, w, parallel, |y, row| {
        let line = &source[y * w..(y + 1) * w];
        for (x, value) in row.iter_mut().enumerate() {
            *value = kernel.convolve(x, w, |i| f64::from(line[i]));
        }
    });

    let total = kernel.total() * kernel.total();
    let mut feathered = AlphaMask::new(width, height);
    for_each_row(&mut *feathered, w, parallel, |y, row| {
        for (x, value) in row.iter_mut().enumerate() {
            let sum = kernel.convolve(y, h, |j| horizontal[j * w + x]);
            *value = round_to_u8(sum / total);
        }
    });

    feathered
}

/// Runs `row` over each `width`-long row, on the rayon pool when asked.
#[cfg_attr(not(feature = "rayon"), allow(unused_variables))]
fn for_each_row<T, F>(buffer: &mut [T], width: usize, parallel: bool, row: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    #[cfg(feature = "rayon")]
    {
        if parallel {
            use rayon::prelude::*;
            buffer
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, values)| row(y, values));
            return;
        }
    }

    buffer
        .chunks_mut(width)
        .enumerate()
        .for_each(|(y, values)| row(y, values));
}

/// One-dimensional Gaussian with clamped-edge folding
///
/// Holds the running sums of the unnormalized weights over `-r..=r`. A
/// sample index that receives several clamped offsets gets their summed
/// weight in one lookup.
struct ClampedGaussian {
    radius: i64,
    /// `cumulative[k]` is the sum of the first `k` weights.
    cumulative: Vec<f64>,
}

impl ClampedGaussian {
    fn new(radius: i64, sigma: f64) -> Self {
        let denominator = 2.0 * sigma * sigma;
        let mut cumulative = Vec::with_capacity(2 * radius as usize + 2);
        let mut sum = 0.0;
        cumulative.push(sum);
        for offset in -radius..=radius {
            sum += (-((offset * offset) as f64) / denominator).exp();
            cumulative.push(sum);
        }
        Self { radius, cumulative }
    }

    fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Weighted sum around `position` of a `len`-long line read through `sample`.
    fn convolve(&self, position: usize, len: usize, sample: impl Fn(usize) -> f64) -> f64 {
        let (r, p, last) = (self.radius, position as i64, len as i64 - 1);
        // Summed weight of the offsets `from..=to`.
        let weight = |from: i64, to: i64| {
            self.cumulative[(to + r + 1) as usize] - self.cumulative[(from + r) as usize]
        };

        ((p - r).max(0)..=(p + r).min(last))
            .map(|i| {
                let from = if i == 0 { -r } else { i - p };
                let to = if i == last { r } else { i - p };
                sample(i as usize) * weight(from, to)
            })
            .sum()
    }
}
