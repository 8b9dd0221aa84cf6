//! Summed-area table over a grayscale image.
//!
//! After an O(n) build, the sum (and mean) of any axis-aligned rectangle is
//! four lookups. The dial detector issues two such queries per candidate
//! circle, which keeps the grid search affordable.

use image::GrayImage;

/// Prefix sums with a zero row and column prepended, so entry
/// `(x, y)` holds the sum of all pixels strictly left of `x` and above `y`.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    sums: Vec<u64>,
}

impl IntegralImage {
    /// Build the table for `image`.
    #[must_use]
    pub fn new(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![0u64; stride * (height as usize + 1)];

        for y in 0..height {
            let mut row_sum = 0u64;
            let row = y as usize;
            for x in 0..width {
                row_sum += u64::from(image.get_pixel(x, y).0[0]);
                let col = x as usize;
                sums[(row + 1) * stride + col + 1] = sums[row * stride + col + 1] + row_sum;
            }
        }

        Self {
            width,
            height,
            sums,
        }
    }

    /// Width of the underlying image.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the underlying image.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    fn at(&self, x: u32, y: u32) -> u64 {
        self.sums[y as usize * (self.width as usize + 1) + x as usize]
    }

    /// Sum over the half-open rectangle `[left, right) x [top, bottom)`.
    ///
    /// Coordinates are clamped to the image; an empty rectangle sums to 0.
    #[must_use]
    pub fn sum(&self, left: i64, top: i64, right: i64, bottom: i64) -> u64 {
        let Some((l, t, r, b)) = self.clamp_rect(left, top, right, bottom) else {
            return 0;
        };
        // Non-negative by construction of the prefix sums.
        self.at(r, b) + self.at(l, t) - self.at(l, b) - self.at(r, t)
    }

    /// Mean intensity over `[left, right) x [top, bottom)` after clamping to
    /// the image, or `None` if nothing of the rectangle lies inside it.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self, left: i64, top: i64, right: i64, bottom: i64) -> Option<f64> {
        let (l, t, r, b) = self.clamp_rect(left, top, right, bottom)?;
        let area = u64::from(r - l) * u64::from(b - t);
        Some(self.sum(left, top, right, bottom) as f64 / area as f64)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn clamp_rect(
        &self,
        left: i64,
        top: i64,
        right: i64,
        bottom: i64,
    ) -> Option<(u32, u32, u32, u32)> {
        let clamp_x = |v: i64| v.clamp(0, i64::from(self.width)) as u32;
        let clamp_y = |v: i64| v.clamp(0, i64::from(self.height)) as u32;
        let (l, r) = (clamp_x(left), clamp_x(right));
        let (t, b) = (clamp_y(top), clamp_y(bottom));
        (l < r && t < b).then_some((l, t, r, b))
    }
}
