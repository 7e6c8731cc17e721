//! Data-driven physics tuning
//!
//! Growth and boost are stored as multipliers (`1 + rate`) so a user-facing
//! rate of 0 leaves the ball untouched. Setters take effect on the next tick.

use serde::{Deserialize, Serialize};

/// Default downward acceleration (units per tick²)
pub const DEFAULT_GRAVITY: f32 = 0.2;
/// Default per-tick velocity decay
pub const DEFAULT_DECAY: f32 = 0.999;
/// Default post-bounce speed increase rate
pub const DEFAULT_VELOCITY_INCREASE_RATE: f32 = 0.01;
/// Default post-bounce radius growth rate
pub const DEFAULT_GROWTH_RATE: f32 = 0.02;

/// Physics knobs read by the update step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningParameters {
    /// Added to vy every tick
    pub gravity: f32,
    /// Velocity multiplier applied every tick
    pub decay: f32,
    /// Velocity multiplier applied after a bounce (`1 + rate`)
    pub boost: f32,
    /// Radius multiplier applied after a bounce (`1 + rate`)
    pub growth: f32,
}

impl Default for TuningParameters {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            decay: DEFAULT_DECAY,
            boost: 1.0 + DEFAULT_VELOCITY_INCREASE_RATE,
            growth: 1.0 + DEFAULT_GROWTH_RATE,
        }
    }
}

impl TuningParameters {
    /// Tuning with every effect disabled (no gravity, no decay, no boost, no growth)
    pub fn neutral() -> Self {
        Self {
            gravity: 0.0,
            decay: 1.0,
            boost: 1.0,
            growth: 1.0,
        }
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }

    pub fn set_decay(&mut self, decay: f32) {
        self.decay = decay;
    }

    /// Set the post-bounce speed increase rate (0.05 = +5% per bounce)
    pub fn set_velocity_increase_rate(&mut self, rate: f32) {
        self.boost = 1.0 + rate;
    }

    /// Set the post-bounce radius growth rate (0.02 = +2% per bounce)
    pub fn set_growth_rate(&mut self, rate: f32) {
        self.growth = 1.0 + rate;
    }

    pub fn velocity_increase_rate(&self) -> f32 {
        self.boost - 1.0
    }

    pub fn growth_rate(&self) -> f32 {
        self.growth - 1.0
    }
}
