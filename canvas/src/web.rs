//! Browser [`Surface`] backed by a `CanvasRenderingContext2d`.
//!
//! This is the only module that touches the DOM canvas API. Eraser strokes
//! use the `destination-out` composite mode so they cut through to the page
//! background exactly like the software raster clears pixels.

use std::f64::consts::TAU;

use frames::Point;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::render::{PaintMode, StrokeStyle, Surface};

pub struct WebSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl WebSurface {
    /// Acquire the 2D context of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the element has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx })
    }

    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl Surface for WebSurface {
    type Error = JsValue;

    fn clear(&mut self) -> Result<(), JsValue> {
        self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
        self.ctx.clear_rect(0.0, 0.0, f64::from(self.canvas.width()), f64::from(self.canvas.height()));
        Ok(())
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), JsValue> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };

        let ctx = &self.ctx;
        ctx.save();
        let op = match style.mode {
            PaintMode::Paint => "source-over",
            PaintMode::Erase => "destination-out",
        };
        ctx.set_global_composite_operation(op)?;
        let color = style.color.to_string();

        if rest.is_empty() {
            // A lone point has no segment to stroke; fill a dot instead.
            ctx.set_fill_style_str(&color);
            ctx.begin_path();
            ctx.arc(first.x, first.y, style.width / 2.0, 0.0, TAU)?;
            ctx.fill();
        } else {
            ctx.set_stroke_style_str(&color);
            ctx.set_line_width(style.width);
            ctx.set_line_cap("round");
            ctx.set_line_join("round");
            ctx.begin_path();
            ctx.move_to(first.x, first.y);
            for p in rest {
                ctx.line_to(p.x, p.y);
            }
            ctx.stroke();
        }

        ctx.restore();
        Ok(())
    }
}
