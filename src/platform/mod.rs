//! Platform abstraction layer
//!
//! The swing core talks to the host only through these traits:
//! - `CharacterMotor`: body position, facing, ground state and movement
//! - `AnimationDriver`: clip crossfades and blend parameters
//! - `Environment`: sphere overlap and sphere cast world queries
//! - `AnchorScanner`: finding a hookable anchor in front of the character
//!
//! `headless` provides in-memory implementations for tools and tests.

pub mod headless;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::collision::{CastHit, ColliderId, Overlap};

pub use headless::{AnimationLog, GroundRegion, KinematicCharacter};

/// Animation clips the swing system plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingClip {
    RopeThrow,
    SwingActions,
    SwingLand,
    SwingClimbUp,
    SwingClimbDown,
    LandAndStepForward,
    Fall,
    HookHolding,
}

/// Which part of the body a clip drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyMask {
    FullBody,
    Arm,
    RightHand,
}

/// An anchor found by an [`AnchorScanner`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorHit {
    /// Point the rope hooks onto
    pub position: Vec3,
    /// Horizontal direction the character should face to throw
    pub approach_direction: Vec3,
    /// Distance from the scan origin
    pub distance: f32,
}

/// Anchor / ledge detection
pub trait AnchorScanner {
    /// Best anchor within `[min_distance, max_distance]` of `origin`, roughly along `aim`
    fn scan_for_anchor(
        &self,
        max_distance: f32,
        min_distance: f32,
        origin: Vec3,
        aim: Vec3,
    ) -> Option<AnchorHit>;
}

/// Read-only world geometry queries
pub trait Environment {
    /// Colliders overlapping a sphere, skipping `exclude`
    fn overlap_sphere(&self, center: Vec3, radius: f32, exclude: Option<ColliderId>) -> Vec<Overlap>;

    /// First collider hit by a sphere swept along `direction` (normalized)
    ///
    /// Colliders already overlapping the sphere at `origin` are ignored.
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<ColliderId>,
    ) -> Option<CastHit>;
}

/// The character body driven by the swing system
pub trait CharacterMotor {
    /// Root position
    fn position(&self) -> Vec3;
    /// Where the hand holding the rope is
    fn hand_position(&self) -> Vec3;
    /// Where the rope is tied to the body
    fn body_attach_position(&self) -> Vec3;
    /// Hip position (origin of swing collision casts)
    fn hip_position(&self) -> Vec3;
    /// Body collider radius
    fn collider_radius(&self) -> f32;
    /// The character's own collider, excluded from rope collision
    fn collider_id(&self) -> Option<ColliderId>;
    /// Horizontal facing direction
    fn facing(&self) -> Vec3;
    fn set_facing(&mut self, direction: Vec3);
    /// Ground contact, `None` when ground data is unavailable this tick
    fn is_grounded(&self) -> Option<bool>;

    /// Move the body by a world-space delta
    fn move_by(&mut self, delta: Vec3);
    /// Hand momentum back to locomotion
    fn set_velocity(&mut self, vertical: f32, planar: Vec3);
    fn set_rotation_locked(&mut self, locked: bool);
    fn enable_root_motion(&mut self, enabled: bool);
    /// Keep locomotion from walking off ledges
    fn set_fall_prevention(&mut self, enabled: bool);
    fn set_item_switch_locked(&mut self, locked: bool);
}

/// Animation playback
pub trait AnimationDriver {
    fn crossfade(&mut self, clip: SwingClip, duration: f32, mask: BodyMask);
    fn set_parameter(&mut self, name: &str, value: f32);
}
