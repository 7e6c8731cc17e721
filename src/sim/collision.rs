//! Collision detection and response against the circular boundary
//!
//! The ball lives inside the circle, so the only contact is with the inner
//! wall. The response is a restitution-scaled reflection about the outward
//! normal, followed by the caller's boost and speed floor.

use glam::Vec2;

use super::state::Boundary;

/// Below this distance from the boundary center the normal is undefined
const NORMAL_EPSILON: f32 = 1e-6;

/// Result of a boundary contact check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryContact {
    /// Outward unit normal (boundary center -> ball center)
    pub normal: Vec2,
    /// Angle of the normal
    pub theta: f32,
    /// Distance from the boundary center to the ball center
    pub distance: f32,
}

/// Check whether the ball touches or exceeds the boundary.
///
/// Touching means `distance >= boundary.radius - ball_radius`. When the ball
/// sits exactly on the boundary center the normal falls back to the velocity
/// direction, then to straight down.
pub fn boundary_contact(
    ball_center: Vec2,
    ball_radius: f32,
    velocity: Vec2,
    boundary: &Boundary,
) -> Option<BoundaryContact> {
    let offset = ball_center - boundary.center;
    let distance = offset.length();

    if distance < boundary.radius - ball_radius {
        return None;
    }

    let normal = if distance > NORMAL_EPSILON {
        offset / distance
    } else {
        let dir = velocity.normalize_or_zero();
        if dir == Vec2::ZERO { Vec2::Y } else { dir }
    };

    let (_, theta) = crate::cartesian_to_polar(normal);
    Some(BoundaryContact {
        normal,
        theta,
        distance,
    })
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Reflection scaled by restitution: `v' · n == -restitution * (v · n)`
#[inline]
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    reflect_velocity(velocity, normal) * restitution
}

/// Rescale velocity up to `min_speed` if it is slower.
///
/// A zero velocity has no direction, so it is pointed along `fallback_dir`.
pub fn enforce_speed_floor(velocity: Vec2, min_speed: f32, fallback_dir: Vec2) -> Vec2 {
    let speed = velocity.length();
    if speed >= min_speed {
        velocity
    } else if speed > NORMAL_EPSILON {
        velocity / speed * min_speed
    } else {
        fallback_dir.normalize_or_zero() * min_speed
    }
}
