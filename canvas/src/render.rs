//! Rendering: repaints a stroke sequence onto a [`Surface`].
//!
//! DESIGN
//! ======
//! [`render`] is a pure function of its input. It clears the surface and then
//! replays every stroke in draw order, so the result never depends on what
//! the surface showed before. There is no incremental repaint path; callers
//! invoke it after every history mutation.
//!
//! The [`Surface`] trait is the only seam between stroke geometry and pixels.
//! [`crate::raster::Raster`] implements it in software for tests and
//! [`crate::web::WebSurface`] implements it on a browser 2D context.
//!
//! ERROR HANDLING
//! ==============
//! Surface calls return the surface's own error type and `render` stops at the
//! first failure. The software raster is infallible.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use frames::{Point, Rgb, Stroke, Tool};

/// How a stroke combines with what is already on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    /// Cover pixels with the stroke color.
    Paint,
    /// Clear pixels back to transparent.
    Erase,
}

/// Resolved pen settings for one stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgb,
    pub width: f64,
    pub mode: PaintMode,
}

impl StrokeStyle {
    /// Style for a stored stroke. Eraser strokes erase; everything else paints.
    #[must_use]
    pub fn for_stroke(stroke: &Stroke) -> Self {
        let mode = match stroke.tool {
            Tool::Eraser => PaintMode::Erase,
            Tool::Brush | Tool::Text => PaintMode::Paint,
        };
        Self { color: stroke.rgb(), width: stroke.line_width, mode }
    }
}

/// A 2D target that can be cleared and stroked with round caps and joins.
pub trait Surface {
    type Error;

    /// Reset every pixel to transparent.
    ///
    /// # Errors
    ///
    /// Surface-specific.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Stroke a connected polyline through `points`. A single point paints a
    /// round dot of diameter `style.width`. An empty slice does nothing.
    ///
    /// # Errors
    ///
    /// Surface-specific.
    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), Self::Error>;
}

/// Clear `surface` and paint `strokes` in order.
///
/// # Errors
///
/// Returns the first error the surface reports.
pub fn render<'a, S, I>(surface: &mut S, strokes: I) -> Result<(), S::Error>
where
    S: Surface,
    I: IntoIterator<Item = &'a Stroke>,
{
    surface.clear()?;
    paint(surface, strokes)
}

/// Paint `strokes` on top of the current surface contents without clearing.
///
/// # Errors
///
/// Returns the first error the surface reports.
pub fn paint<'a, S, I>(surface: &mut S, strokes: I) -> Result<(), S::Error>
where
    S: Surface,
    I: IntoIterator<Item = &'a Stroke>,
{
    for stroke in strokes {
        if stroke.points.is_empty() || !stroke.line_width.is_finite() || stroke.line_width <= 0.0 {
            continue;
        }
        surface.stroke_polyline(&stroke.points, &StrokeStyle::for_stroke(stroke))?;
    }
    Ok(())
}
