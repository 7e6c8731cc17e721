//! Physics simulation module
//!
//! Pure update logic for the ball inside its boundary:
//! - One step per tick, no wall-clock dependency
//! - Seeded RNG only (per-run color)
//! - No rendering or platform dependencies

pub mod collision;
pub mod state;
pub mod tick;

pub use collision::{BoundaryContact, boundary_contact, bounce_velocity, reflect_velocity};
pub use state::{
    BallState, Boundary, Collision, CollisionMarks, MotionTrail, PhysicsState, SimulationColor,
};
pub use tick::tick;
