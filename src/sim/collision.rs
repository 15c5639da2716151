//! Contact queries and collision response
//!
//! Query results returned by an [`Environment`](crate::platform::Environment)
//! and the two responses built on them: rope points bouncing off obstacles,
//! and the swinging character deflecting off walls.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::UP;

/// Identifies a collider in the environment (used to exclude the character's own body)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColliderId(pub u32);

/// A collider overlapping a query sphere
#[derive(Debug, Clone, Copy)]
pub struct Overlap {
    pub collider: ColliderId,
    /// Closest point on the collider surface to the query center
    pub point: Vec3,
    /// Surface normal at `point`, pointing out of the collider
    pub normal: Vec3,
    /// Concave triangle meshes are reported but ropes ignore them
    pub concave_mesh: bool,
}

/// First hit of a swept sphere
#[derive(Debug, Clone, Copy)]
pub struct CastHit {
    pub collider: ColliderId,
    /// Contact point on the collider surface
    pub point: Vec3,
    /// Surface normal at contact
    pub normal: Vec3,
    /// Distance travelled along the cast direction
    pub distance: f32,
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Rope point response to an overlap
///
/// Returns the relocated point (just outside the surface) and the reflected,
/// damped velocity.
pub fn rope_point_response(
    velocity: Vec3,
    contact: &Overlap,
    point_radius: f32,
    dampening: f32,
) -> (Vec3, Vec3) {
    let velocity = reflect_velocity(velocity, contact.normal) * (1.0 - dampening);
    let position = contact.point + contact.normal * point_radius;
    (position, velocity)
}

/// Swinging body response to a wall hit
///
/// The reflected direction is biased upward so the character slides up and
/// off instead of sticking, and the speed is scaled by `friction`.
pub fn deflect_velocity(velocity: Vec3, normal: Vec3, friction: f32) -> Vec3 {
    let speed = velocity.length();
    let reflection = reflect_velocity(velocity.normalize_or_zero(), normal) + UP * 0.5;
    reflection.normalize_or_zero() * speed * friction
}

/// First overlap a rope point should respond to
///
/// Skips concave meshes; the environment already excludes the owner.
pub fn first_rope_contact(overlaps: &[Overlap]) -> Option<&Overlap> {
    overlaps.iter().find(|o| !o.concave_mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlap(normal: Vec3, concave_mesh: bool) -> Overlap {
        Overlap {
            collider: ColliderId(1),
            point: Vec3::ZERO,
            normal,
            concave_mesh,
        }
    }

    #[test]
    fn test_reflect_velocity() {
        // Moving down onto a floor
        let reflected = reflect_velocity(Vec3::new(1.0, -2.0, 0.0), Vec3::Y);
        assert!((reflected - Vec3::new(1.0, 2.0, 0.0)).length() < 0.0001);
    }

    #[test]
    fn test_rope_point_response_moves_outside() {
        let contact = overlap(Vec3::Y, false);
        let (pos, vel) = rope_point_response(Vec3::new(0.0, -4.0, 0.0), &contact, 0.05, 0.5);
        assert!((pos - Vec3::new(0.0, 0.05, 0.0)).length() < 0.0001);
        assert!((vel - Vec3::new(0.0, 2.0, 0.0)).length() < 0.0001);
    }

    #[test]
    fn test_deflect_velocity_biases_up_and_slows() {
        // Swinging straight into a wall facing -X
        let v = Vec3::new(10.0, 0.0, 0.0);
        let out = deflect_velocity(v, Vec3::NEG_X, 0.2);
        assert!(out.x < 0.0);
        assert!(out.y > 0.0);
        assert!((out.length() - 2.0).abs() < 0.0001);
    }

    #[test]
    fn test_first_rope_contact_skips_concave() {
        let overlaps = [overlap(Vec3::X, true), overlap(Vec3::Y, false)];
        let contact = first_rope_contact(&overlaps).expect("convex contact");
        assert_eq!(contact.normal, Vec3::Y);
        assert!(first_rope_contact(&overlaps[..1]).is_none());
    }
}
