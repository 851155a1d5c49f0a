//! Stroke data model shared by the canvas engine and the server.
//!
//! A [`Stroke`] is the on-wire and on-disk unit: one pointer-down to
//! pointer-up drawing action. A whiteboard's content is an ordered array of
//! strokes in draw order.

use serde::{Deserialize, Serialize};

/// Error returned by [`Stroke::validate`] and [`Rgb::parse`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrokeError {
    #[error("invalid color: {0:?}")]
    InvalidColor(String),
    #[error("line width must be a positive finite number, got {0}")]
    InvalidLineWidth(f64),
    #[error("stroke has no points")]
    NoPoints,
    #[error("point {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },
}

/// Drawing tool that produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    Text,
}

/// A canvas point in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An opaque 8-bit RGB color parsed from `#RRGGBB` or `#RGB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self { r: 255, g: 255, b: 255 };

    /// Parse a CSS hex color.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidColor`] unless the input is `#` followed
    /// by exactly 3 or 6 hex digits.
    pub fn parse(s: &str) -> Result<Self, StrokeError> {
        let invalid = || StrokeError::InvalidColor(s.to_owned());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self { r: channel(&hex[0..2])?, g: channel(&hex[2..4])?, b: channel(&hex[4..6])? }),
            3 => {
                // #abc expands to #aabbcc
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                Ok(Self { r: r * 17, g: g * 17, b: b * 17 })
            }
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// One drawn path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub tool: Tool,
    pub color: String,
    pub line_width: f64,
    pub points: Vec<Point>,
}

impl Stroke {
    /// Create a stroke seeded with its first point.
    #[must_use]
    pub fn new(tool: Tool, color: impl Into<String>, line_width: f64, start: Point) -> Self {
        Self { tool, color: color.into(), line_width, points: vec![start] }
    }

    /// Check the invariants every persisted or relayed stroke must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule: color format, positive finite line
    /// width, at least one point, finite coordinates.
    pub fn validate(&self) -> Result<(), StrokeError> {
        Rgb::parse(&self.color)?;
        if !(self.line_width.is_finite() && self.line_width > 0.0) {
            return Err(StrokeError::InvalidLineWidth(self.line_width));
        }
        if self.points.is_empty() {
            return Err(StrokeError::NoPoints);
        }
        if let Some(index) = self.points.iter().position(|p| !p.is_finite()) {
            return Err(StrokeError::NonFinitePoint { index });
        }
        Ok(())
    }

    /// Parsed stroke color. Falls back to black for colors that never went
    /// through [`Stroke::validate`].
    #[must_use]
    pub fn rgb(&self) -> Rgb {
        Rgb::parse(&self.color).unwrap_or(Rgb::BLACK)
    }
}

/// Validate every stroke in draw order, reporting the first bad index.
///
/// # Errors
///
/// Returns `(index, error)` for the first invalid stroke.
pub fn validate_all(strokes: &[Stroke]) -> Result<(), (usize, StrokeError)> {
    for (index, stroke) in strokes.iter().enumerate() {
        stroke.validate().map_err(|e| (index, e))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "stroke_test.rs"]
mod tests;
