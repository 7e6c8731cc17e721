//! Canvas 2D surface (web)

use std::f64::consts::TAU;

use glam::Vec2;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::surface::Surface;
use crate::error::SetupError;

/// `Surface` backed by a `<canvas>` element's 2D context
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Acquire the 2D context; fails if the canvas has no area or no 2D support
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SetupError> {
        if canvas.width() == 0 || canvas.height() == 0 {
            return Err(SetupError::SurfaceUnavailable(
                "canvas has zero width or height".into(),
            ));
        }

        let ctx = canvas
            .get_context("2d")
            .map_err(|e| SetupError::SurfaceUnavailable(format!("{:?}", e)))?
            .ok_or_else(|| SetupError::SurfaceUnavailable("2d context not supported".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SetupError::SurfaceUnavailable("not a 2d context".into()))?;

        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn circle_path(&self, center: Vec2, radius: f32) {
        self.ctx.begin_path();
        // arc only fails on a negative radius
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            radius.max(0.0) as f64,
            0.0,
            TAU,
        );
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (f32, f32) {
        (self.canvas.width() as f32, self.canvas.height() as f32)
    }

    fn clear(&mut self, color: &str) {
        let (w, h) = self.size();
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(0.0, 0.0, w as f64, h as f64);
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, line_width: f32, color: &str) {
        self.circle_path(center, radius);
        self.ctx.set_line_width(line_width as f64);
        self.ctx.set_stroke_style_str(color);
        self.ctx.stroke();
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, line_width: f32, color: &str) {
        self.ctx.begin_path();
        self.ctx.move_to(from.x as f64, from.y as f64);
        self.ctx.line_to(to.x as f64, to.y as f64);
        self.ctx.set_line_width(line_width as f64);
        self.ctx.set_stroke_style_str(color);
        self.ctx.stroke();
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: &str, alpha: f32) {
        self.circle_path(center, radius);
        self.ctx.set_global_alpha(alpha as f64);
        self.ctx.set_fill_style_str(color);
        self.ctx.fill();
        self.ctx.set_global_alpha(1.0);
    }

    fn fill_text(&mut self, text: &str, pos: Vec2, font: &str, color: &str) {
        self.ctx.set_font(font);
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_fill_style_str(color);
        if let Err(e) = self.ctx.fill_text(text, pos.x as f64, pos.y as f64) {
            log::warn!("fill_text failed: {:?}", e);
        }
    }
}
