use image::Primitive;

/// Summed-area table (integral image) over a single channel
///
/// Each entry holds the sum of all values in the rectangle from the origin to
/// that coordinate, so any axis-aligned rectangle sum costs four lookups.
pub struct SummedAreaTable<T> {
    /// Cumulative sums, row-major
    data: Vec<T>,
    /// Table width
    width: u32,
    /// Table height
    height: u32,
}

impl<T> SummedAreaTable<T>
where
    T: Primitive,
{
    /// Builds a table from single channel data.
    ///
    /// # Arguments
    ///
    /// * `data` - Channel values in row-major order, `width * height` long
    /// * `width` - Data width
    /// * `height` - Data height
    ///
    /// # Panics
    ///
    /// When `data.len() != width * height`.
    #[must_use]
    pub fn from_data(data: &[T], width: u32, height: u32) -> Self {
        assert_eq!(data.len(), (width as usize) * (height as usize));

        let w = width as usize;
        let mut sat_data = vec![T::zero(); data.len()];

        for (index, &value) in data.iter().enumerate() {
            let (x, y) = (index % w, index / w);

            // sat(x, y) = src(x, y) + sat(x-1, y) + sat(x, y-1) - sat(x-1, y-1)
            let mut sum = value;
            if x > 0 {
                sum = sum + sat_data[index - 1];
            }
            if y > 0 {
                sum = sum + sat_data[index - w];
            }
            if x > 0 && y > 0 {
                sum = sum - sat_data[index - w - 1];
            }

            sat_data[index] = sum;
        }

        Self {
            data: sat_data,
            width,
            height,
        }
    }

    /// Table value at `(x, y)`, or zero outside the table.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> T {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            T::zero()
        } else {
            self.data[(y as usize) * (self.width as usize) + x as usize]
        }
    }

    /// Sum of the values in the inclusive rectangle `(x1, y1)..=(x2, y2)`.
    ///
    /// The rectangle is clipped to the table; an empty rectangle sums to zero.
    ///
    /// Sum = sat(x2, y2) - sat(x1-1, y2) - sat(x2, y1-1) + sat(x1-1, y1-1)
    #[must_use]
    pub fn rectangle_sum(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> T {
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(i64::from(self.width) - 1);
        let y2 = y2.min(i64::from(self.height) - 1);

        if x1 > x2 || y1 > y2 {
            return T::zero();
        }

        let bottom_right = self.get(x2, y2);
        let top_right = self.get(x2, y1 - 1);
        let bottom_left = self.get(x1 - 1, y2);
        let top_left = self.get(x1 - 1, y1 - 1);

        // Add before subtracting so unsigned tables never underflow.
        bottom_right + top_left - top_right - bottom_left
    }
}

/// One axis of a clamped square window
///
/// Samples left of the axis read index 0 and samples right of it read the
/// last index, so the window is the in-bounds range `first..=last` plus the
/// two edge values repeated `before` and `after` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClampedSpan {
    first: i64,
    last: i64,
    before: u128,
    after: u128,
}

impl ClampedSpan {
    fn new(center: u32, radius: u32, len: u32) -> Self {
        let (center, radius, end) = (i64::from(center), i64::from(radius), i64::from(len) - 1);
        let (start, stop) = (center - radius, center + radius);
        Self {
            first: start.max(0),
            last: stop.min(end),
            before: (-start).max(0) as u128,
            after: (stop - end).max(0) as u128,
        }
    }
}

impl SummedAreaTable<u64> {
    /// Sum of the `(2r+1)²` window around `(x, y)` with sample coordinates
    /// clamped to the table.
    ///
    /// The overhang past each edge is counted as repeated edge rows, columns
    /// and corners, so the cost does not depend on the radius and no padded
    /// copy of the channel is built.
    #[must_use]
    pub fn clamped_window_sum(&self, x: u32, y: u32, radius: u32) -> u128 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }

        let xs = ClampedSpan::new(x, radius, self.width);
        let ys = ClampedSpan::new(y, radius, self.height);
        let (right, bottom) = (i64::from(self.width) - 1, i64::from(self.height) - 1);
        let rect = |x1, y1, x2, y2| u128::from(self.rectangle_sum(x1, y1, x2, y2));

        let inside = rect(xs.first, ys.first, xs.last, ys.last);
        let edges = xs.before * rect(0, ys.first, 0, ys.last)
            + xs.after * rect(right, ys.first, right, ys.last)
            + ys.before * rect(xs.first, 0, xs.last, 0)
            + ys.after * rect(xs.first, bottom, xs.last, bottom);
        let corners = xs.before * ys.before * rect(0, 0, 0, 0)
            + xs.before * ys.after * rect(0, bottom, 0, bottom)
            + xs.after * ys.before * rect(right, 0, right, 0)
            + xs.after * ys.after * rect(right, bottom, right, bottom);

        inside + edges + corners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_summed_area_table() {
        let data = vec![1u64, 2, 3, 4, 5, 6, 7, 8, 9];
        let sat = SummedAreaTable::from_data(&data, 3, 3);

        // 1  3  6
        // 5  12 21
        // 12 27 45
        assert_eq!(sat.get(0, 0), 1);
        assert_eq!(sat.get(1, 0), 3);
        assert_eq!(sat.get(2, 0), 6);
        assert_eq!(sat.get(0, 1), 5);
        assert_eq!(sat.get(1, 1), 12);
        assert_eq!(sat.get(2, 1), 21);
        assert_eq!(sat.get(0, 2), 12);
        assert_eq!(sat.get(1, 2), 27);
        assert_eq!(sat.get(2, 2), 45);
    }

    #[test]
    fn test_rectangle_sum() {
        let data = vec![1u64, 2, 3, 4, 5, 6, 7, 8, 9];
        let sat = SummedAreaTable::from_data(&data, 3, 3);

        assert_eq!(sat.rectangle_sum(0, 0, 2, 2), 45);
        assert_eq!(sat.rectangle_sum(1, 1, 1, 1), 5);
        assert_eq!(sat.rectangle_sum(0, 0, 1, 1), 12);
        assert_eq!(sat.rectangle_sum(1, 1, 2, 2), 28);
        assert_eq!(sat.rectangle_sum(2, 0, 2, 2), 18);
    }

    #[test]
    fn test_boundary_conditions() {
        let data = vec![1u64, 2, 3, 4];
        let sat = SummedAreaTable::from_data(&data, 2, 2);

        assert_eq!(sat.get(-1, 0), 0);
        assert_eq!(sat.get(0, -1), 0);
        assert_eq!(sat.get(2, 0), 0);
        assert_eq!(sat.get(0, 2), 0);

        assert_eq!(sat.rectangle_sum(1, 1, 0, 0), 0);
        assert_eq!(sat.rectangle_sum(-1, -1, 0, 0), 1);
    }

    #[test]
    fn clamped_window_repeats_edges() {
        // 1 2
        // 3 4
        let sat = SummedAreaTable::from_data(&[1u64, 2, 3, 4], 2, 2);

        // With r = 1 the window around (0, 0) reads the replicated grid
        // 1 1 2
        // 1 1 2
        // 3 3 4
        assert_eq!(sat.clamped_window_sum(0, 0, 1), 1 + 1 + 2 + 1 + 1 + 2 + 3 + 3 + 4);
        assert_eq!(sat.clamped_window_sum(1, 1, 0), 4);
        // r = 2 around (1, 1) reads columns 0,0,1,1,1 and rows 0,0,1,1,1.
        assert_eq!(sat.clamped_window_sum(1, 1, 2), 4 * 1 + 6 * 2 + 6 * 3 + 9 * 4);
    }

    #[test]
    fn clamped_window_with_huge_radius_does_not_overflow() {
        let sat = SummedAreaTable::from_data(&[255u64; 4], 2, 2);
        let side = 2 * u128::from(u32::MAX) + 1;
        assert_eq!(sat.clamped_window_sum(0, 1, u32::MAX), 255 * side * side);
    }
}
