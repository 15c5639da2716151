//! Pendulum integrator and swing helpers
//!
//! Pure functions over swing state: the constrained integration step,
//! steering, climbing, landing momentum and animation blend parameters.
//! The controller owns the state; nothing in here touches collaborators.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::{EPSILON, UP};
use crate::platform::SwingClip;
use crate::settings::SwingSettings;
use crate::{angle_from_down_deg, horizontal, move_towards};

/// Fraction of the max swing angle beyond which extra damping applies
const HIGH_ANGLE_DAMPING_RATIO: f32 = 0.7;

/// Integrator tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumParams {
    pub gravity: Vec3,
    /// Extra damping rate (1/s)
    pub damping: f32,
    pub max_swing_angle_deg: f32,
}

impl PendulumParams {
    pub fn from_settings(settings: &SwingSettings) -> Self {
        Self {
            gravity: settings.gravity_vector(),
            damping: settings.damping,
            max_swing_angle_deg: settings.max_swing_angle_deg,
        }
    }
}

/// Kinematic state of the swinging body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bob {
    pub position: Vec3,
    pub velocity: Vec3,
    pub previous_velocity: Vec3,
}

/// Result of one integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumStep {
    /// Position on the sphere about the pivot
    pub position: Vec3,
    pub velocity: Vec3,
    /// Pivot -> position
    pub rope_vector: Vec3,
    /// New apex, when vertical velocity flipped from up to down this step
    pub apex: Option<Vec3>,
}

/// A point mass constrained to a sphere of `length` about `pivot`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pendulum {
    pub pivot: Vec3,
    pub length: f32,
}

impl Pendulum {
    pub fn new(pivot: Vec3, length: f32) -> Self {
        Self { pivot, length }
    }

    /// Advance the bob by `dt`
    ///
    /// Gravity, projection onto the sphere, velocity from the projected
    /// displacement, extra damping while falling without steering or past
    /// 70% of the max angle, then apex detection.
    pub fn step(
        &self,
        bob: Bob,
        steering_idle: bool,
        params: &PendulumParams,
        dt: f32,
    ) -> PendulumStep {
        if dt <= 0.0 {
            return PendulumStep {
                position: bob.position,
                velocity: bob.velocity,
                rope_vector: bob.position - self.pivot,
                apex: None,
            };
        }

        let mut velocity = bob.velocity + params.gravity * dt;
        let unconstrained = bob.position + velocity * dt;
        let rope_vector = (unconstrained - self.pivot)
            .try_normalize()
            .unwrap_or(-UP)
            * self.length;
        let position = self.pivot + rope_vector;
        velocity = (position - bob.position) / dt;

        let angle = angle_from_down_deg(rope_vector);
        if (velocity.y < 0.0 && steering_idle)
            || angle > params.max_swing_angle_deg * HIGH_ANGLE_DAMPING_RATIO
        {
            velocity *= 1.0 - params.damping * dt;
        }

        let apex = (bob.previous_velocity.y > 0.0 && velocity.y < 0.0)
            .then(|| bob.position + velocity * dt);

        log::trace!(
            "pendulum: angle {:.1} speed {:.2} apex {}",
            angle,
            velocity.length(),
            apex.is_some()
        );

        PendulumStep {
            position,
            velocity,
            rope_vector,
            apex,
        }
    }
}

/// Camera-relative steering target for a 2D input axis
///
/// `axis.x` is right, `axis.y` is forward along the horizontal view direction.
pub fn steer_target(axis: Vec2, view_forward: Vec3) -> Vec3 {
    let forward = horizontal(view_forward).normalize_or_zero();
    let right = UP.cross(forward);
    (right * axis.x + forward * axis.y).normalize_or_zero()
}

/// Smooth the steering direction toward the input at one unit per second
pub fn steer_toward(current: Vec3, axis: Vec2, view_forward: Vec3, dt: f32) -> Vec3 {
    move_towards(current, steer_target(axis, view_forward), dt)
}

/// Whether steering force may be added this tick
///
/// Allowed below the max angle when steering does not oppose horizontal
/// motion, or whenever the body is nearly still horizontally.
pub fn steering_allowed(
    rope_angle_deg: f32,
    steer_direction: Vec3,
    velocity: Vec3,
    settings: &SwingSettings,
) -> bool {
    let planar = horizontal(velocity);
    let along = steer_direction.dot(planar.normalize_or_zero());
    (rope_angle_deg < settings.max_swing_angle_deg && along >= 0.0)
        || planar.length() < settings.steer_speed_threshold
}

/// Which way the character climbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClimbDirection {
    /// Shorten the rope
    Up,
    /// Lengthen the rope
    Down,
}

impl ClimbDirection {
    pub fn clip(self) -> SwingClip {
        match self {
            ClimbDirection::Up => SwingClip::SwingClimbUp,
            ClimbDirection::Down => SwingClip::SwingClimbDown,
        }
    }
}

/// Both the rope and the last apex hang within `threshold` of vertical
pub fn is_low_velocity(rope_angle_deg: f32, apex_angle_deg: f32, threshold_deg: f32) -> bool {
    rope_angle_deg < threshold_deg && apex_angle_deg < threshold_deg
}

/// Climb direction for the vertical input, if there is headroom for it
pub fn climb_direction(
    vertical_input: f32,
    length: f32,
    settings: &SwingSettings,
) -> Option<ClimbDirection> {
    if vertical_input > 0.0 && length > settings.min_distance + settings.climb_up_headroom {
        Some(ClimbDirection::Up)
    } else if vertical_input < 0.0 && length < settings.rope_length - settings.climb_down_headroom
    {
        Some(ClimbDirection::Down)
    } else {
        None
    }
}

/// Rope length after climbing for `dt`, clamped to `[min, max]`
pub fn climb_length(
    length: f32,
    vertical_input: f32,
    climb_speed: f32,
    dt: f32,
    min: f32,
    max: f32,
) -> f32 {
    (length - climb_speed * vertical_input * dt).clamp(min, max.max(min))
}

/// Momentum handed back to locomotion when letting go mid-air
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingPlan {
    /// Horizontal direction of travel
    pub direction: Vec3,
    /// Apex to body distance in the rest plane
    pub apex_distance: f32,
    /// Where the body is expected to come down, relative to it
    pub target_offset: Vec3,
    /// Vertical speed handed to locomotion
    pub vertical: f32,
    /// Planar velocity handed to locomotion
    pub planar: Vec3,
    /// Clip to play on release
    pub clip: SwingClip,
}

/// Compute the landing hand-off
///
/// With `play_land` the full scaled momentum is handed over and the land clip
/// plays; otherwise half of it, with the falling clip.
pub fn plan_landing(
    pivot: Vec3,
    length: f32,
    position: Vec3,
    apex: Vec3,
    velocity: Vec3,
    play_land: bool,
    settings: &SwingSettings,
) -> LandingPlan {
    let direction = horizontal(velocity.normalize_or_zero());
    let rest_height = pivot.y - length;
    let on_plane = |p: Vec3| Vec3::new(p.x, rest_height, p.z);
    let apex_distance = on_plane(apex).distance(on_plane(position));
    let forward = settings.forward_land_force_multiplier;
    let upward = settings.upward_land_force_multiplier;

    let (scale, clip) = if play_land {
        (1.0, SwingClip::SwingLand)
    } else {
        (0.5, SwingClip::Fall)
    };

    LandingPlan {
        direction,
        apex_distance,
        target_offset: direction.normalize_or_zero() * apex_distance * forward,
        vertical: velocity.y * upward * scale,
        planar: velocity * forward * scale,
        clip,
    }
}

/// `x`/`y` blend tree inputs from the offset to the rest point below the pivot
///
/// The offset is expressed in the character's facing frame and scaled so a
/// swing of `max_swing_len` reads as 0.5.
pub fn blend_parameters(
    rest_point: Vec3,
    length: f32,
    position: Vec3,
    facing: Vec3,
    settings: &SwingSettings,
) -> Vec2 {
    let max_swing_len = (length * (settings.max_swing_angle_deg + settings.gravity).to_radians())
        .clamp(0.1, 3.0);
    let offset = position - rest_point;
    if offset.length_squared() < EPSILON * EPSILON {
        return Vec2::ZERO;
    }
    let percentage = offset.length() / max_swing_len * 0.5;

    let forward = horizontal(facing).try_normalize().unwrap_or(Vec3::Z);
    let right = UP.cross(forward);
    let dir = offset.normalize_or_zero();
    let local = Vec3::new(dir.dot(right), dir.dot(UP), dir.dot(forward)).normalize_or_zero()
        * percentage;
    Vec2::new(local.x, local.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn params() -> PendulumParams {
        PendulumParams::from_settings(&SwingSettings::default())
    }

    #[test]
    fn test_step_stays_on_sphere() {
        let pendulum = Pendulum::new(Vec3::new(0.0, 5.0, 0.0), 5.0);
        let mut bob = Bob {
            position: Vec3::new(3.0, 1.0, 0.0),
            velocity: Vec3::new(0.0, 0.0, 2.0),
            previous_velocity: Vec3::ZERO,
        };
        for _ in 0..120 {
            let step = pendulum.step(bob, true, &params(), DT);
            assert!((step.position.distance(pendulum.pivot) - 5.0).abs() < 0.001);
            assert!((step.rope_vector.length() - 5.0).abs() < 0.001);
            bob = Bob {
                position: step.position,
                velocity: step.velocity,
                previous_velocity: step.velocity,
            };
        }
    }

    #[test]
    fn test_at_rest_stays_at_rest() {
        let pendulum = Pendulum::new(Vec3::new(0.0, 5.0, 0.0), 5.0);
        let bob = Bob {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            previous_velocity: Vec3::ZERO,
        };
        let step = pendulum.step(bob, true, &params(), DT);
        assert!(step.position.length() < 0.0001);
        assert!(step.velocity.length() < 0.0001);
        assert!(step.apex.is_none());
    }

    #[test]
    fn test_apex_recorded_on_flip() {
        let pendulum = Pendulum::new(Vec3::new(0.0, 5.0, 0.0), 5.0);
        let mut bob = Bob {
            position: Vec3::ZERO,
            velocity: Vec3::new(4.0, 0.0, 0.0),
            previous_velocity: Vec3::ZERO,
        };
        let mut apex = None;
        for _ in 0..240 {
            let step = pendulum.step(bob, true, &params(), DT);
            if step.apex.is_some() {
                apex = step.apex;
                break;
            }
            bob = Bob {
                position: step.position,
                velocity: step.velocity,
                previous_velocity: step.velocity,
            };
        }
        let apex = apex.expect("apex");
        assert!(apex.x > 0.0);
        // Energy bound: v²/2g = 16/40
        assert!(apex.y > 0.0 && apex.y <= 0.4 + 0.01);
    }

    #[test]
    fn test_scenario_sixty_degree_release() {
        let settings = SwingSettings {
            gravity: -20.0,
            ..SwingSettings::default()
        };
        let params = PendulumParams::from_settings(&settings);
        let pivot = Vec3::new(0.0, 5.0, 0.0);
        let length = 5.0;
        let pendulum = Pendulum::new(pivot, length);

        // 60 degrees out on -x, pushed toward +x at 4 m/s
        let theta = 60f32.to_radians();
        let start = pivot + Vec3::new(-theta.sin(), -theta.cos(), 0.0) * length;
        let mut bob = Bob {
            position: start,
            velocity: Vec3::new(4.0, 0.0, 0.0),
            previous_velocity: Vec3::ZERO,
        };

        let mut found = None;
        for tick in 1..=600 {
            let step = pendulum.step(bob, true, &params, DT);
            let before = bob.position;
            bob = Bob {
                position: step.position,
                velocity: step.velocity,
                previous_velocity: step.velocity,
            };
            if let Some(apex) = step.apex {
                found = Some((tick, apex, step, step.position.y < before.y));
                break;
            }
        }
        let (tick, apex, step, descending) = found.expect("apex");

        assert_eq!(tick, 97);
        assert!((apex - Vec3::new(3.491_150, 1.420_632, 0.0)).length() < 1e-4);
        assert!((step.velocity - Vec3::new(-0.018_669, -0.018_243, 0.0)).length() < 1e-4);

        // Same release rule the controller applies
        let low_velocity = is_low_velocity(
            angle_from_down_deg(step.rope_vector),
            angle_from_down_deg(apex - pivot),
            settings.climb_angle_threshold_deg,
        );
        assert!(descending);
        assert!(!low_velocity);
        let play_land = !low_velocity && !descending;

        let plan = plan_landing(
            pivot,
            length,
            step.position,
            apex,
            step.velocity,
            play_land,
            &settings,
        );
        assert_eq!(plan.clip, SwingClip::Fall);
        assert!((plan.vertical - -0.018_243).abs() < 1e-4);
        assert!((plan.planar - Vec3::new(-0.009_334, -0.009_122, 0.0)).length() < 1e-4);
        assert!(plan.direction.x < 0.0 && plan.direction.y == 0.0);
        assert!(plan.apex_distance < 1e-4);
    }

    #[test]
    fn test_landing_full_momentum() {
        let settings = SwingSettings::default();
        let velocity = Vec3::new(3.0, 2.0, 0.0);
        let plan = plan_landing(
            Vec3::new(0.0, 5.0, 0.0),
            5.0,
            Vec3::new(1.0, 0.2, 0.0),
            Vec3::new(-2.0, 1.0, 0.0),
            velocity,
            true,
            &settings,
        );
        assert_eq!(plan.clip, SwingClip::SwingLand);
        assert!((plan.apex_distance - 3.0).abs() < 0.0001);
        assert!((plan.vertical - 4.0).abs() < 0.0001);
        assert_eq!(plan.planar, velocity);
        assert!(plan.direction.y.abs() < 0.0001);
        assert!((plan.target_offset.length() - 3.0).abs() < 0.0001);
    }

    #[test]
    fn test_steer_target_camera_relative() {
        let fwd = steer_target(Vec2::new(0.0, 1.0), Vec3::new(0.0, -0.5, 1.0));
        assert!((fwd - Vec3::Z).length() < 0.0001);
        let right = steer_target(Vec2::new(1.0, 0.0), Vec3::Z);
        assert!((right - Vec3::X).length() < 0.0001);
        assert_eq!(steer_target(Vec2::ZERO, Vec3::Z), Vec3::ZERO);
    }

    #[test]
    fn test_steer_toward_is_rate_limited() {
        let dir = steer_toward(Vec3::ZERO, Vec2::new(0.0, 1.0), Vec3::Z, 0.25);
        assert!((dir.length() - 0.25).abs() < 0.0001);
    }

    #[test]
    fn test_steering_gate() {
        let settings = SwingSettings::default();
        // With motion, below max angle
        assert!(steering_allowed(30.0, Vec3::X, Vec3::new(2.0, 0.0, 0.0), &settings));
        // Opposing motion
        assert!(!steering_allowed(30.0, -Vec3::X, Vec3::new(2.0, 0.0, 0.0), &settings));
        // Past max angle
        assert!(!steering_allowed(70.0, Vec3::X, Vec3::new(2.0, 0.0, 0.0), &settings));
        // Nearly still always allowed
        assert!(steering_allowed(70.0, -Vec3::X, Vec3::new(0.05, 0.0, 0.0), &settings));
    }

    #[test]
    fn test_climb_direction_headroom() {
        let settings = SwingSettings::default();
        assert_eq!(climb_direction(1.0, 5.0, &settings), Some(ClimbDirection::Up));
        assert_eq!(climb_direction(1.0, 3.0, &settings), None);
        assert_eq!(climb_direction(-1.0, 5.0, &settings), Some(ClimbDirection::Down));
        assert_eq!(climb_direction(-1.0, 9.8, &settings), None);
        assert_eq!(climb_direction(0.0, 5.0, &settings), None);
        assert!(is_low_velocity(5.0, 10.0, 15.0));
        assert!(!is_low_velocity(5.0, 20.0, 15.0));
    }

    #[test]
    fn test_blend_parameters() {
        let settings = SwingSettings::default();
        let rest = Vec3::ZERO;
        assert_eq!(blend_parameters(rest, 5.0, Vec3::ZERO, Vec3::Z, &settings), Vec2::ZERO);

        // Swung forward along facing
        let p = blend_parameters(rest, 5.0, Vec3::new(0.0, 0.5, 2.0), Vec3::Z, &settings);
        assert!(p.x.abs() < 0.0001);
        assert!(p.y > 0.0);

        // Swung to the right of facing
        let p = blend_parameters(rest, 5.0, Vec3::new(2.0, 0.5, 0.0), Vec3::Z, &settings);
        assert!(p.x > 0.0);
        assert!(p.y.abs() < 0.0001);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_undamped_angle_stays_within_max(
            start_deg in 0.0f32..=60.0,
            azimuth in 0.0f32..std::f32::consts::TAU,
            length in 2.0f32..=10.0,
            speed_fraction in 0.0f32..=0.9,
            toward in proptest::bool::ANY,
        ) {
            let params = PendulumParams {
                damping: 0.0,
                ..params()
            };
            let g = -params.gravity.y;
            let max = params.max_swing_angle_deg.to_radians();
            let pivot = Vec3::new(0.0, 12.0, 0.0);
            let pendulum = Pendulum::new(pivot, length);
            let theta = start_deg.to_radians();
            let out = Vec3::new(azimuth.cos(), 0.0, azimuth.sin());

            // Tangential speed that keeps total energy under the max angle height
            let headroom = (2.0 * g * length * (theta.cos() - max.cos())).max(0.0);
            let speed = speed_fraction * headroom.sqrt();
            let tangent = out * theta.cos() + UP * theta.sin();
            let sign = if toward { -1.0 } else { 1.0 };

            let mut bob = Bob {
                position: pivot + (out * theta.sin() - UP * theta.cos()) * length,
                velocity: tangent * speed * sign,
                previous_velocity: Vec3::ZERO,
            };
            for _ in 0..1200 {
                let step = pendulum.step(bob, true, &params, DT);
                prop_assert!(angle_from_down_deg(step.rope_vector) <= params.max_swing_angle_deg + 1.0);
                bob = Bob {
                    position: step.position,
                    velocity: step.velocity,
                    previous_velocity: step.velocity,
                };
            }
        }

        #[test]
        fn prop_climb_stays_in_bounds(
            start in 2.0f32..=10.0,
            inputs in proptest::collection::vec(-1.0f32..=1.0, 1..200),
        ) {
            let settings = SwingSettings::default();
            let mut length = start;
            for input in inputs {
                length = climb_length(
                    length,
                    input,
                    settings.climb_speed,
                    DT,
                    settings.min_distance,
                    settings.rope_length,
                );
                prop_assert!(length >= settings.min_distance && length <= settings.rope_length);
            }
        }
    }
}
