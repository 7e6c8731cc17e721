//! Full-frame repaint of the simulation

use glam::Vec2;

use super::label::LabelEntity;
use super::surface::Surface;
use crate::consts::BOUNDARY_LINE_WIDTH;
use crate::sim::PhysicsState;

/// Background color
pub const BACKGROUND: &str = "#000000";
/// Width of the lines from collision marks to the ball
pub const MARK_LINE_WIDTH: f32 = 2.0;
/// Opacity of the newest trail afterimage
pub const TRAIL_MAX_ALPHA: f32 = 0.13;
/// Distance of the elapsed-time readout below the boundary
pub const READOUT_OFFSET: f32 = 60.0;
pub const READOUT_FONT: &str = "bold 32px sans-serif";
pub const READOUT_COLOR: &str = "#ffffff";

/// Stateless painter; every call repaints the whole surface
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Paint one frame: background, boundary, mark lines, labels, readout, trail, ball
    pub fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        state: &PhysicsState,
        labels: &[LabelEntity],
        elapsed_secs: f64,
    ) {
        let color = state.color.css();
        let boundary = state.boundary();
        let ball = &state.ball;

        surface.clear(BACKGROUND);

        surface.stroke_circle(
            boundary.center,
            boundary.radius + BOUNDARY_LINE_WIDTH / 2.0,
            BOUNDARY_LINE_WIDTH,
            &color,
        );

        for mark in state.marks.as_slice() {
            surface.stroke_line(*mark, ball.center, MARK_LINE_WIDTH, &color);
        }

        for label in labels {
            surface.fill_text(&label.text, label.position, &label.css_font(), &label.color);
        }

        let readout_pos = boundary.center + Vec2::new(0.0, boundary.radius + READOUT_OFFSET);
        surface.fill_text(
            &format_elapsed(elapsed_secs),
            readout_pos,
            READOUT_FONT,
            READOUT_COLOR,
        );

        let count = state.trail.len();
        for (i, pos) in state.trail.iter().enumerate() {
            surface.fill_circle(*pos, ball.radius, &color, trail_alpha(i, count));
        }

        surface.fill_circle(ball.center, ball.radius, &color, 1.0);
    }
}

/// Alpha for trail entry `index` (0 = oldest) out of `count`
pub fn trail_alpha(index: usize, count: usize) -> f32 {
    if count == 0 {
        return 0.0;
    }
    (index + 1) as f32 / count as f32 * TRAIL_MAX_ALPHA
}

/// Elapsed-time readout text
pub fn format_elapsed(elapsed_secs: f64) -> String {
    format!("{:.1}s", elapsed_secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::surface::{DrawCommand, RecordingSurface};
    use crate::tuning::TuningParameters;

    fn label(id: u32, text: &str) -> LabelEntity {
        LabelEntity {
            id,
            text: text.into(),
            position: Vec2::new(540.0, 200.0),
            font_family: "Arial".into(),
            size: 40.0,
            color: "#ff00ff".into(),
            bold: true,
        }
    }

    #[test]
    fn test_frame_order() {
        let mut state = PhysicsState::new(1080.0, 1920.0, TuningParameters::default(), 3);
        for _ in 0..3 {
            state.update();
        }
        state.marks.push(Vec2::new(1.0, 2.0));

        let mut surface = RecordingSurface::new(1080.0, 1920.0);
        Renderer::new().draw(&mut surface, &state, &[label(1, "Satisfying")], 12.34);

        let cmds = surface.commands();
        assert!(matches!(cmds[0], DrawCommand::Clear { .. }));
        assert!(matches!(cmds[1], DrawCommand::StrokeCircle { .. }));
        assert!(matches!(cmds[2], DrawCommand::StrokeLine { to, .. } if to == state.ball.center));
        assert!(
            matches!(&cmds[3], DrawCommand::FillText { text, font, .. } if text == "Satisfying" && font == "bold 40px Arial")
        );
        assert!(matches!(&cmds[4], DrawCommand::FillText { text, .. } if text == "12.3s"));
        // 3 trail circles then the opaque ball
        assert_eq!(cmds.len(), 5 + 3 + 1);
        assert!(matches!(cmds[8], DrawCommand::FillCircle { alpha, .. } if alpha == 1.0));
    }

    #[test]
    fn test_boundary_stroke_sits_outside_radius() {
        let state = PhysicsState::new(800.0, 800.0, TuningParameters::default(), 3);
        let mut surface = RecordingSurface::new(800.0, 800.0);
        Renderer::new().draw(&mut surface, &state, &[], 0.0);

        match &surface.commands()[1] {
            DrawCommand::StrokeCircle {
                radius, line_width, ..
            } => {
                assert_eq!(*radius, state.boundary().radius + line_width / 2.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_trail_alpha_ramps_to_cap() {
        let alphas: Vec<f32> = (0..5).map(|i| trail_alpha(i, 5)).collect();
        assert!(alphas.windows(2).all(|w| w[0] < w[1]));
        assert!((alphas[4] - TRAIL_MAX_ALPHA).abs() < 1e-6);
        assert_eq!(trail_alpha(0, 0), 0.0);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0.0), "0.0s");
        assert_eq!(format_elapsed(65.27), "65.3s");
    }
}
