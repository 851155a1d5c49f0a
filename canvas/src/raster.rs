//! Software RGBA surface.
//!
//! Coverage is binary: a pixel is inside a stroke when its center lies within
//! `width / 2` of some segment of the polyline. Each segment is stamped as a
//! capsule, which yields round caps and round joins without any join logic.
//! Output is a deterministic function of the draw calls, so two rasters fed
//! the same strokes compare equal byte for byte.

use std::convert::Infallible;

use frames::{Point, Rgb};

use crate::render::{PaintMode, StrokeStyle, Surface};

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Fixed-size RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl Raster {
    /// A fully transparent raster.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![TRANSPARENT; width as usize * height as usize] }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA at `(x, y)`, or `None` outside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.index(x, y).and_then(|i| self.pixels.get(i).copied())
    }

    /// Whether `(x, y)` holds exactly `color` at full opacity.
    #[must_use]
    pub fn is_color(&self, x: u32, y: u32, color: Rgb) -> bool {
        self.pixel(x, y) == Some([color.r, color.g, color.b, 255])
    }

    /// Number of non-transparent pixels.
    #[must_use]
    pub fn painted(&self) -> usize {
        self.pixels.iter().filter(|px| px[3] != 0).count()
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels.iter().flatten().copied().collect()
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Stamp a capsule of radius `r` around segment `a..b`.
    fn stamp_segment(&mut self, a: Point, b: Point, r: f64, value: [u8; 4]) {
        let Some((x0, x1)) = pixel_span(a.x.min(b.x) - r, a.x.max(b.x) + r, self.width) else {
            return;
        };
        let Some((y0, y1)) = pixel_span(a.y.min(b.y) - r, a.y.max(b.y) + r, self.height) else {
            return;
        };

        let r2 = r * r;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if distance_sq_to_segment(center, a, b) <= r2 {
                    if let Some(i) = self.index(x, y) {
                        self.pixels[i] = value;
                    }
                }
            }
        }
    }
}

impl Surface for Raster {
    type Error = Infallible;

    fn clear(&mut self) -> Result<(), Infallible> {
        self.pixels.fill(TRANSPARENT);
        Ok(())
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), Infallible> {
        let value = match style.mode {
            PaintMode::Paint => [style.color.r, style.color.g, style.color.b, 255],
            PaintMode::Erase => TRANSPARENT,
        };
        let r = style.width / 2.0;

        match points {
            [] => {}
            [only] => self.stamp_segment(*only, *only, r, value),
            _ => {
                for pair in points.windows(2) {
                    self.stamp_segment(pair[0], pair[1], r, value);
                }
            }
        }
        Ok(())
    }
}

/// Clamp a continuous `[lo, hi]` range to inclusive pixel indices in
/// `0..limit`. `None` when the range misses the raster entirely.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_span(lo: f64, hi: f64, limit: u32) -> Option<(u32, u32)> {
    if limit == 0 || !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let max = f64::from(limit - 1);
    let lo = lo.floor().max(0.0);
    let hi = hi.ceil().min(max);
    if lo > hi {
        return None;
    }
    Some((lo as u32, hi as u32))
}

fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 { 0.0 } else { (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0) };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    (p.x - cx).powi(2) + (p.y - cy).powi(2)
}
