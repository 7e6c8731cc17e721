//! Raster surface abstraction
//!
//! The renderer only ever talks to a `Surface`. On the web that is a canvas 2D
//! context; headless builds record draw commands instead of pixels.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// The 2D drawing operations the renderer needs
pub trait Surface {
    /// Surface size in pixels (width, height)
    fn size(&self) -> (f32, f32);

    /// Fill the whole surface with a color
    fn clear(&mut self, color: &str);

    /// Stroke a circle outline
    fn stroke_circle(&mut self, center: Vec2, radius: f32, line_width: f32, color: &str);

    /// Stroke a straight line segment
    fn stroke_line(&mut self, from: Vec2, to: Vec2, line_width: f32, color: &str);

    /// Fill a circle at the given opacity (0..1)
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: &str, alpha: f32);

    /// Draw text centered (horizontally and vertically) on `pos`
    fn fill_text(&mut self, text: &str, pos: Vec2, font: &str, color: &str);
}

/// A single recorded draw call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        color: String,
    },
    StrokeCircle {
        center: Vec2,
        radius: f32,
        line_width: f32,
        color: String,
    },
    StrokeLine {
        from: Vec2,
        to: Vec2,
        line_width: f32,
        color: String,
    },
    FillCircle {
        center: Vec2,
        radius: f32,
        color: String,
        alpha: f32,
    },
    FillText {
        text: String,
        pos: Vec2,
        font: String,
        color: String,
    },
}

/// Headless surface that keeps the draw calls of the latest frame
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Draw calls since the last `clear`
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: &str) {
        // A full repaint starts a new frame
        self.commands.clear();
        self.commands.push(DrawCommand::Clear {
            color: color.to_string(),
        });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, line_width: f32, color: &str) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            line_width,
            color: color.to_string(),
        });
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, line_width: f32, color: &str) {
        self.commands.push(DrawCommand::StrokeLine {
            from,
            to,
            line_width,
            color: color.to_string(),
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: &str, alpha: f32) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color: color.to_string(),
            alpha,
        });
    }

    fn fill_text(&mut self, text: &str, pos: Vec2, font: &str, color: &str) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            pos,
            font: font.to_string(),
            color: color.to_string(),
        });
    }
}
