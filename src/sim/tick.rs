//! Per-tick physics update
//!
//! Semi-implicit step: gravity and decay change the velocity first, then the
//! position moves by the new velocity. A boundary contact reflects, grows,
//! boosts and re-seats the ball inside the circle in the same tick.

use super::collision::{boundary_contact, bounce_velocity, enforce_speed_floor};
use super::state::{Collision, PhysicsState};
use crate::consts::{MIN_SPEED, RESTITUTION};

/// Advance the physics state by one tick
pub fn tick(state: &mut PhysicsState) -> Option<Collision> {
    state.time_ticks += 1;
    state.trail.record(state.ball.center);

    let tuning = state.tuning;
    let boundary = *state.boundary();
    let ball = &mut state.ball;

    ball.velocity.y += tuning.gravity;
    ball.velocity *= tuning.decay;
    ball.center += ball.velocity;

    let contact = boundary_contact(ball.center, ball.radius, ball.velocity, &boundary)?;

    let reflected = bounce_velocity(ball.velocity, contact.normal, RESTITUTION);
    ball.radius = (ball.radius * tuning.growth).min(ball.max_radius);
    // Zero-speed fallback points back toward the center
    ball.velocity = enforce_speed_floor(reflected * tuning.boost, MIN_SPEED, -contact.normal);

    let point = boundary.point_at(contact.theta);
    state.marks.push(point);

    // Re-seat just inside the wall so the next tick can't stick or tunnel
    ball.center =
        boundary.center + crate::polar_to_cartesian(boundary.radius - ball.radius, contact.theta);

    log::trace!(
        "bounce #{} at ({:.1}, {:.1}), radius {:.2}",
        state.marks.len(),
        point.x,
        point.y,
        ball.radius
    );

    Some(Collision {
        point,
        normal: contact.normal,
    })
}
