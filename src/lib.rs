//! Rope Swing - rope throwing and pendulum swinging for a third-person character
//!
//! Core modules:
//! - `sim`: Rope chains, throw animation, swing state machine and pendulum integrator
//! - `platform`: Collaborator traits (motor, animation, world queries) and headless implementations
//! - `renderer`: Line vertex data for drawing ropes
//! - `settings`: Data-driven swing tuning
//! - `error`: Crate error type

pub mod error;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{Result, SwingError};
pub use settings::{RopeQuality, SwingSettings};

use glam::Vec3;

/// Simulation constants
pub mod consts {
    use glam::Vec3;

    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World up axis
    pub const UP: Vec3 = Vec3::Y;

    /// Distances below this are treated as zero (segment guard, normalisation)
    pub const EPSILON: f32 = 1e-6;

    /// Rope gravity (m/s²), independent of the swing gravity tunable
    pub const ROPE_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
}

/// Remove the vertical component of a vector
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Unsigned angle between two vectors in degrees (0 if either is zero)
#[inline]
pub fn angle_between_deg(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom < consts::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle between `v` and straight down, in degrees
#[inline]
pub fn angle_from_down_deg(v: Vec3) -> f32 {
    angle_between_deg(Vec3::NEG_Y, v)
}

/// Move `current` toward `target` by at most `max_delta`
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let dist = delta.length();
    if dist <= max_delta || dist < consts::EPSILON {
        target
    } else {
        current + delta / dist * max_delta
    }
}

/// Rotate direction `from` toward `to` by at most `max_radians`
///
/// Both inputs are normalised; the result is a unit vector. Zero inputs return `from` unchanged.
pub fn rotate_towards(from: Vec3, to: Vec3, max_radians: f32) -> Vec3 {
    let (Some(from), Some(to)) = (from.try_normalize(), to.try_normalize()) else {
        return from;
    };
    let angle = from.dot(to).clamp(-1.0, 1.0).acos();
    if angle <= max_radians {
        return to;
    }
    let rotation = glam::Quat::from_rotation_arc(from, to);
    glam::Quat::IDENTITY.slerp(rotation, max_radians / angle) * from
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_from_down() {
        assert!(angle_from_down_deg(Vec3::NEG_Y).abs() < 0.001);
        assert!((angle_from_down_deg(Vec3::X) - 90.0).abs() < 0.001);
        assert!((angle_from_down_deg(Vec3::Y) - 180.0).abs() < 0.01);
        assert_eq!(angle_from_down_deg(Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_move_towards_clamps() {
        let v = move_towards(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 1.0);
        assert!((v - Vec3::X).length() < 0.0001);
        let v = move_towards(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0), 1.0);
        assert_eq!(v, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_rotate_towards_partial_and_full() {
        let half = rotate_towards(Vec3::X, Vec3::Z, std::f32::consts::FRAC_PI_4);
        assert!((angle_between_deg(half, Vec3::X) - 45.0).abs() < 0.01);
        let full = rotate_towards(Vec3::X, Vec3::Z, std::f32::consts::PI);
        assert!((full - Vec3::Z).length() < 0.0001);
    }
}
