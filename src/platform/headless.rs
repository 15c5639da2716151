//! In-memory platform for tools and tests
//!
//! `KinematicCharacter` is a point-mass body with flat ground regions, enough
//! to walk off a ledge, fall, and be moved by the swing controller.
//! `AnimationLog` records every animation request.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use super::{AnimationDriver, BodyMask, CharacterMotor, SwingClip};
use crate::consts::UP;
use crate::horizontal;
use crate::sim::collision::ColliderId;

/// A flat walkable rectangle at a fixed height
#[derive(Debug, Clone, Copy)]
pub struct GroundRegion {
    /// Minimum corner on the XZ plane
    pub min: Vec2,
    /// Maximum corner on the XZ plane
    pub max: Vec2,
    pub height: f32,
}

impl GroundRegion {
    pub fn new(min: Vec2, max: Vec2, height: f32) -> Self {
        Self { min, max, height }
    }

    /// Whether a world position lies over this region
    pub fn covers(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.y && p.z <= self.max.y
    }
}

/// Simple kinematic character body
#[derive(Debug, Clone)]
pub struct KinematicCharacter {
    pub position: Vec3,
    pub facing: Vec3,
    /// Locomotion/ballistic velocity, used by [`KinematicCharacter::step`]
    pub velocity: Vec3,
    pub ground: Vec<GroundRegion>,
    /// When false, `is_grounded` reports missing data
    pub ground_data: bool,
    pub collider: Option<ColliderId>,
    pub radius: f32,
    pub hand_height: f32,
    pub hand_reach: f32,
    pub body_height: f32,
    pub hip_height: f32,

    pub rotation_locked: bool,
    pub root_motion: bool,
    pub fall_prevention: bool,
    pub item_switch_locked: bool,
    /// Last momentum handed over by `set_velocity`
    pub last_handoff: Option<(f32, Vec3)>,
}

impl KinematicCharacter {
    const GROUND_TOLERANCE: f32 = 0.05;

    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            facing: Vec3::Z,
            velocity: Vec3::ZERO,
            ground: Vec::new(),
            ground_data: true,
            collider: None,
            radius: 0.3,
            hand_height: 1.5,
            hand_reach: 0.3,
            body_height: 1.0,
            hip_height: 0.9,
            rotation_locked: false,
            root_motion: false,
            fall_prevention: false,
            item_switch_locked: false,
            last_handoff: None,
        }
    }

    pub fn with_ground(mut self, region: GroundRegion) -> Self {
        self.ground.push(region);
        self
    }

    pub fn with_collider(mut self, id: ColliderId) -> Self {
        self.collider = Some(id);
        self
    }

    /// Highest ground below (or at) a position
    pub fn ground_height_at(&self, p: Vec3) -> Option<f32> {
        self.ground
            .iter()
            .filter(|g| g.covers(p) && g.height <= p.y + Self::GROUND_TOLERANCE)
            .map(|g| g.height)
            .reduce(f32::max)
    }

    /// Advance locomotion physics when nothing else owns the body
    ///
    /// Walks with the horizontal velocity, falls under `gravity` when
    /// unsupported, and lands on ground regions.
    pub fn step(&mut self, dt: f32, gravity: f32) {
        let grounded = self.is_grounded().unwrap_or(false);
        if grounded && self.velocity.y <= 0.0 {
            self.velocity.y = 0.0;
        } else {
            self.velocity.y += gravity * dt;
        }
        self.move_by(self.velocity * dt);
    }
}

impl CharacterMotor for KinematicCharacter {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn hand_position(&self) -> Vec3 {
        self.position + UP * self.hand_height + self.facing * self.hand_reach
    }

    fn body_attach_position(&self) -> Vec3 {
        self.position + UP * self.body_height
    }

    fn hip_position(&self) -> Vec3 {
        self.position + UP * self.hip_height
    }

    fn collider_radius(&self) -> f32 {
        self.radius
    }

    fn collider_id(&self) -> Option<ColliderId> {
        self.collider
    }

    fn facing(&self) -> Vec3 {
        self.facing
    }

    fn set_facing(&mut self, direction: Vec3) {
        if let Some(dir) = horizontal(direction).try_normalize() {
            self.facing = dir;
        }
    }

    fn is_grounded(&self) -> Option<bool> {
        if !self.ground_data {
            return None;
        }
        Some(
            self.ground_height_at(self.position)
                .is_some_and(|h| (self.position.y - h).abs() <= Self::GROUND_TOLERANCE),
        )
    }

    fn move_by(&mut self, delta: Vec3) {
        let before = self.position;
        self.position += delta;
        // Land on any region we were above before the move
        if let Some(h) = self
            .ground
            .iter()
            .filter(|g| g.covers(self.position) && g.height <= before.y + Self::GROUND_TOLERANCE)
            .map(|g| g.height)
            .reduce(f32::max)
        {
            if self.position.y < h {
                self.position.y = h;
                self.velocity.y = self.velocity.y.max(0.0);
            }
        }
    }

    fn set_velocity(&mut self, vertical: f32, planar: Vec3) {
        self.velocity = horizontal(planar) + UP * vertical;
        self.last_handoff = Some((vertical, planar));
    }

    fn set_rotation_locked(&mut self, locked: bool) {
        self.rotation_locked = locked;
    }

    fn enable_root_motion(&mut self, enabled: bool) {
        self.root_motion = enabled;
    }

    fn set_fall_prevention(&mut self, enabled: bool) {
        self.fall_prevention = enabled;
    }

    fn set_item_switch_locked(&mut self, locked: bool) {
        self.item_switch_locked = locked;
    }
}

/// Records animation requests
#[derive(Debug, Clone, Default)]
pub struct AnimationLog {
    pub crossfades: Vec<(SwingClip, f32, BodyMask)>,
    pub parameters: HashMap<String, f32>,
}

impl AnimationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent crossfade target
    pub fn last_clip(&self) -> Option<SwingClip> {
        self.crossfades.last().map(|(clip, _, _)| *clip)
    }

    pub fn played(&self, clip: SwingClip) -> bool {
        self.crossfades.iter().any(|(c, _, _)| *c == clip)
    }
}

impl AnimationDriver for AnimationLog {
    fn crossfade(&mut self, clip: SwingClip, duration: f32, mask: BodyMask) {
        log::debug!("crossfade {:?} over {:.2}s ({:?})", clip, duration, mask);
        self.crossfades.push((clip, duration, mask));
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        self.parameters.insert(name.to_string(), value);
    }
}
