//! Physics state and core simulation types
//!
//! Everything the update step mutates lives here. Trail, marks and color are
//! rendering-only and never feed back into the physics.

use std::collections::VecDeque;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::tuning::TuningParameters;

/// The bouncing ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub center: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    /// Growth ceiling (derived from the boundary radius)
    pub max_radius: f32,
}

impl BallState {
    /// Ball at its starting position for the given boundary
    pub fn initial(boundary: &Boundary) -> Self {
        Self {
            center: boundary.center - Vec2::new(0.0, boundary.radius * BALL_START_LIFT_RATIO),
            velocity: Vec2::new(BALL_START_VX, 0.0),
            radius: boundary.radius * BALL_START_RADIUS_RATIO,
            max_radius: boundary.radius * BALL_MAX_RADIUS_RATIO,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Whether a point lies on or inside the ball
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance(self.center) <= self.radius
    }
}

/// Fixed circular boundary, derived once from the surface size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub center: Vec2,
    pub radius: f32,
}

impl Boundary {
    /// Centered on the surface, sized from the shorter side
    pub fn from_surface(width: f32, height: f32) -> Self {
        Self {
            center: Vec2::new(width / 2.0, height / 2.0),
            radius: width.min(height) * BOUNDARY_RADIUS_RATIO,
        }
    }

    /// Point on the boundary circle at angle `theta`
    pub fn point_at(&self, theta: f32) -> Vec2 {
        self.center + crate::polar_to_cartesian(self.radius, theta)
    }
}

/// Recent ball centers, oldest first, fixed capacity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionTrail {
    points: VecDeque<Vec2>,
}

impl MotionTrail {
    pub fn new() -> Self {
        Self {
            points: VecDeque::with_capacity(TRAIL_CAPACITY + 1),
        }
    }

    /// Record a center, evicting the oldest beyond capacity
    pub fn record(&mut self, pos: Vec2) {
        self.points.push_back(pos);
        while self.points.len() > TRAIL_CAPACITY {
            self.points.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Vec2> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Boundary points where the ball bounced, in collision order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionMarks {
    points: Vec<Vec2>,
}

impl CollisionMarks {
    pub fn push(&mut self, point: Vec2) {
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn as_slice(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-run hue for boundary, lines, trail and ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationColor {
    /// Degrees, 0..360
    pub hue: f32,
}

impl SimulationColor {
    pub fn random(rng: &mut Pcg32) -> Self {
        Self {
            hue: rng.random_range(0.0..360.0),
        }
    }

    /// CSS color string
    pub fn css(&self) -> String {
        format!("hsl({:.0}, 100%, 50%)", self.hue)
    }
}

/// A single boundary bounce
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Point on the boundary circle where the ball touched
    pub point: Vec2,
    /// Outward unit normal at the contact
    pub normal: Vec2,
}

/// Ball + boundary + rendering-only history, owned by the driver
#[derive(Debug, Clone)]
pub struct PhysicsState {
    pub ball: BallState,
    boundary: Boundary,
    pub trail: MotionTrail,
    pub marks: CollisionMarks,
    pub color: SimulationColor,
    pub tuning: TuningParameters,
    /// Simulation tick counter since the last reset
    pub time_ticks: u64,
    rng: Pcg32,
}

impl PhysicsState {
    /// Create state for a surface of the given size
    pub fn new(width: f32, height: f32, tuning: TuningParameters, seed: u64) -> Self {
        let boundary = Boundary::from_surface(width, height);
        let mut rng = Pcg32::seed_from_u64(seed);
        let color = SimulationColor::random(&mut rng);
        Self {
            ball: BallState::initial(&boundary),
            boundary,
            trail: MotionTrail::new(),
            marks: CollisionMarks::default(),
            color,
            tuning,
            time_ticks: 0,
            rng,
        }
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Restore the starting ball, clear history and roll a new color
    pub fn reset(&mut self) {
        self.ball = BallState::initial(&self.boundary);
        self.trail.clear();
        self.marks.clear();
        self.color = SimulationColor::random(&mut self.rng);
        self.time_ticks = 0;
    }

    /// External drag: place the ball and drop its velocity
    pub fn drag_to(&mut self, pos: Vec2) {
        self.ball.center = pos;
        self.ball.velocity = Vec2::ZERO;
    }

    /// Advance one tick; returns the bounce if one happened
    pub fn update(&mut self) -> Option<Collision> {
        super::tick::tick(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_from_surface() {
        let boundary = Boundary::from_surface(1080.0, 1920.0);
        assert_eq!(boundary.center, Vec2::new(540.0, 960.0));
        assert!((boundary.radius - 432.0).abs() < 1e-3);
    }

    #[test]
    fn test_trail_evicts_oldest() {
        let mut trail = MotionTrail::new();
        for i in 0..8 {
            trail.record(Vec2::new(i as f32, 0.0));
        }
        assert_eq!(trail.len(), TRAIL_CAPACITY);
        let xs: Vec<f32> = trail.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut state = PhysicsState::new(800.0, 800.0, TuningParameters::default(), 7);
        for _ in 0..500 {
            state.update();
        }
        state.reset();
        let first = state.ball;
        state.reset();
        assert_eq!(state.ball.radius, first.radius);
        assert_eq!(state.ball.center, first.center);
        assert!(state.trail.is_empty());
        assert!(state.marks.is_empty());
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_drag_zeroes_velocity() {
        let mut state = PhysicsState::new(800.0, 800.0, TuningParameters::default(), 1);
        state.drag_to(Vec2::new(100.0, 120.0));
        assert_eq!(state.ball.center, Vec2::new(100.0, 120.0));
        assert_eq!(state.ball.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_ball_contains() {
        let state = PhysicsState::new(800.0, 800.0, TuningParameters::default(), 1);
        let ball = state.ball;
        assert!(ball.contains(ball.center));
        assert!(ball.contains(ball.center + Vec2::new(ball.radius, 0.0)));
        assert!(!ball.contains(ball.center + Vec2::new(ball.radius + 1.0, 0.0)));
    }

    #[test]
    fn test_color_css() {
        let color = SimulationColor { hue: 200.4 };
        assert_eq!(color.css(), "hsl(200, 100%, 50%)");
    }
}
