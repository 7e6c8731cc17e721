//! Bounce Loop - a growing ball bouncing inside a circle
//!
//! Core modules:
//! - `sim`: Physics state and the per-tick collision update (pure, no I/O)
//! - `renderer`: Repaints the surface from physics state, trail, marks and labels
//! - `driver`: Frame loop, run/stop/drag state machine, capture hookup
//! - `capture`: Canvas + audio capture sessions producing recorded artifacts
//! - `batch`: Unattended N-run reset/record/stop sequencing
//! - `platform`: Clock, frame scheduler and timer seams (web + headless)
//! - `audio`: Collision chime routed into the capture
//! - `tuning` / `settings`: Tunable physics and persisted preferences

pub mod audio;
pub mod batch;
pub mod capture;
pub mod driver;
pub mod error;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use batch::{BatchHost, BatchOrchestrator};
pub use capture::{CaptureArtifact, CaptureSession, CompletionCallback, Recorder};
pub use driver::{DriveState, Simulation};
pub use error::{BatchError, CaptureError, SetupError};
pub use renderer::{LabelEntity, Renderer, Surface};
pub use settings::Settings;
pub use sim::PhysicsState;
pub use tuning::TuningParameters;

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Number of past ball centers kept for the motion trail
    pub const TRAIL_CAPACITY: usize = 5;
    /// Fraction of normal velocity kept after a bounce
    pub const RESTITUTION: f32 = 0.95;
    /// Post-bounce speed floor (units per tick)
    pub const MIN_SPEED: f32 = 1.0;

    /// Boundary radius as a fraction of the shorter surface side
    pub const BOUNDARY_RADIUS_RATIO: f32 = 0.4;
    /// Boundary outline width (pixels)
    pub const BOUNDARY_LINE_WIDTH: f32 = 10.0;

    /// Starting ball radius as a fraction of the boundary radius
    pub const BALL_START_RADIUS_RATIO: f32 = 0.04;
    /// Growth ceiling as a fraction of the boundary radius
    pub const BALL_MAX_RADIUS_RATIO: f32 = 0.9;
    /// Starting offset above the boundary center, as a fraction of boundary radius
    pub const BALL_START_LIFT_RATIO: f32 = 0.5;
    /// Starting horizontal velocity (units per tick)
    pub const BALL_START_VX: f32 = 3.0;

    /// Capture frame rate
    pub const CAPTURE_FRAME_RATE: u32 = 60;
    /// Pause between batch runs (seconds)
    pub const BATCH_PAUSE_SECS: f64 = 1.0;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}
