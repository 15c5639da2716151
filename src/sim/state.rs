//! Swing state and session types
//!
//! Everything the controller tracks between ticks lives here.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::angle_from_down_deg;
use crate::consts::UP;
use crate::platform::{AnchorHit, CharacterMotor};

/// Current phase of the swing controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SwingPhase {
    /// Normal locomotion, nothing hooked
    #[default]
    Idle,
    /// Hook input held, scanning for an anchor
    Aiming,
    /// Turning to face the anchor before the throw
    Rotating,
    /// Throw wind-up
    Throwing,
    /// Hook in flight
    AttachPending,
    /// Hooked while still on the ground, waiting to swing off
    GroundedAnchoring,
    /// Pendulum motion
    Swinging,
    /// Changing rope length while swinging
    Climbing,
    /// Released from the rope, landing clip playing
    Landing,
    /// Rope retracted, throws disabled until the cooldown expires
    Retracting,
}

impl SwingPhase {
    /// Multi-tick waits polled for the interrupt flag
    pub fn interruptible(self) -> bool {
        matches!(
            self,
            SwingPhase::Rotating
                | SwingPhase::Throwing
                | SwingPhase::AttachPending
                | SwingPhase::Landing
        )
    }

    /// Phases where the controller moves the character body
    pub fn owns_motion(self) -> bool {
        matches!(self, SwingPhase::Swinging | SwingPhase::Climbing)
    }
}

/// Notifications for host systems that react to the swing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingEvent {
    /// Hook left the hand
    RopeReleased,
    /// Hook reached the anchor
    RopeHooked,
    /// Character left the ground on the rope
    SwingStarted,
    /// Character let go of the rope
    SwingEnded,
}

/// Transient state of one hook-and-swing attempt
#[derive(Debug, Clone)]
pub struct SwingSession {
    /// Anchor the session was started from
    pub anchor: AnchorHit,
    /// Fixed pendulum pivot
    pub pivot: Vec3,
    /// Live rope length (pendulum radius)
    pub current_length: f32,
    pub velocity: Vec3,
    pub previous_velocity: Vec3,
    /// Highest point since the last upward-to-downward flip
    pub apex: Vec3,
    /// Smoothed steering direction (unit or zero)
    pub steer_direction: Vec3,
    /// Last pivot -> hand vector
    pub rope_vector: Vec3,
    /// Hand distance to the pivot last seen while grounded
    pub grounded_length: f32,
    /// Hand position on the previous tick
    pub prev_position: Vec3,
    /// Hand displacement over the previous tick
    pub last_displacement: Vec3,
    /// Hand moved down over the previous tick
    pub descending: bool,
    /// Rope and apex both near vertical
    pub low_velocity: bool,
}

impl SwingSession {
    pub fn new(anchor: AnchorHit, hand: Vec3) -> Self {
        let pivot = anchor.position;
        let length = hand.distance(pivot);
        Self {
            anchor,
            pivot,
            current_length: length,
            velocity: Vec3::ZERO,
            previous_velocity: Vec3::ZERO,
            apex: hand,
            steer_direction: Vec3::ZERO,
            rope_vector: hand - pivot,
            grounded_length: length,
            prev_position: hand,
            last_displacement: Vec3::ZERO,
            descending: false,
            low_velocity: false,
        }
    }

    /// Clamp the live length to `[min, max]`
    pub fn clamp_length(&mut self, min: f32, max: f32) {
        self.current_length = self.current_length.clamp(min, max.max(min));
    }

    /// Point directly below the pivot at the current length
    pub fn rest_point(&self) -> Vec3 {
        self.pivot - UP * self.current_length
    }

    /// Rope angle from vertical, in degrees
    pub fn rope_angle_deg(&self) -> f32 {
        angle_from_down_deg(self.rope_vector)
    }

    /// Angle of the recorded apex from vertical, in degrees
    pub fn apex_angle_deg(&self) -> f32 {
        angle_from_down_deg(self.apex - self.pivot)
    }
}

/// Motor restrictions the controller currently holds
///
/// Everything set here is undone by [`MotorLocks::release_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorLocks {
    pub rotation: bool,
    pub item_switch: bool,
    pub fall_prevention: bool,
    pub root_motion: bool,
}

impl MotorLocks {
    pub fn set_rotation<M: CharacterMotor + ?Sized>(&mut self, motor: &mut M, locked: bool) {
        motor.set_rotation_locked(locked);
        self.rotation = locked;
    }

    pub fn set_item_switch<M: CharacterMotor + ?Sized>(&mut self, motor: &mut M, locked: bool) {
        motor.set_item_switch_locked(locked);
        self.item_switch = locked;
    }

    pub fn set_fall_prevention<M: CharacterMotor + ?Sized>(&mut self, motor: &mut M, enabled: bool) {
        motor.set_fall_prevention(enabled);
        self.fall_prevention = enabled;
    }

    pub fn set_root_motion<M: CharacterMotor + ?Sized>(&mut self, motor: &mut M, enabled: bool) {
        motor.enable_root_motion(enabled);
        self.root_motion = enabled;
    }

    pub fn any(&self) -> bool {
        self.rotation || self.item_switch || self.fall_prevention || self.root_motion
    }

    /// Restore every held flag on the motor
    pub fn release_all<M: CharacterMotor + ?Sized>(&mut self, motor: &mut M) {
        if self.rotation {
            motor.set_rotation_locked(false);
        }
        if self.item_switch {
            motor.set_item_switch_locked(false);
        }
        if self.fall_prevention {
            motor.set_fall_prevention(false);
        }
        if self.root_motion {
            motor.enable_root_motion(false);
        }
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::KinematicCharacter;

    fn hit(position: Vec3) -> AnchorHit {
        AnchorHit {
            position,
            approach_direction: Vec3::Z,
            distance: position.length(),
        }
    }

    #[test]
    fn test_session_starts_at_hand() {
        let session = SwingSession::new(hit(Vec3::new(0.0, 6.0, 0.0)), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(session.pivot, Vec3::new(0.0, 6.0, 0.0));
        assert!((session.current_length - 5.0).abs() < 0.0001);
        assert!(session.rope_angle_deg().abs() < 0.001);
        assert_eq!(session.rest_point(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_clamp_length() {
        let mut session = SwingSession::new(hit(Vec3::new(0.0, 20.0, 0.0)), Vec3::ZERO);
        session.clamp_length(2.0, 10.0);
        assert_eq!(session.current_length, 10.0);
        session.current_length = 0.5;
        session.clamp_length(2.0, 10.0);
        assert_eq!(session.current_length, 2.0);
    }

    #[test]
    fn test_phase_groups() {
        assert!(SwingPhase::Rotating.interruptible());
        assert!(!SwingPhase::Swinging.interruptible());
        assert!(SwingPhase::Climbing.owns_motion());
        assert!(!SwingPhase::GroundedAnchoring.owns_motion());
        assert!(SwingPhase::Landing.interruptible());
        assert!(!SwingPhase::Retracting.interruptible());
    }

    #[test]
    fn test_release_all_restores_motor() {
        let mut motor = KinematicCharacter::new(Vec3::ZERO);
        let mut locks = MotorLocks::default();
        locks.set_rotation(&mut motor, true);
        locks.set_item_switch(&mut motor, true);
        locks.set_root_motion(&mut motor, true);
        assert!(locks.any());
        assert!(motor.rotation_locked && motor.item_switch_locked && motor.root_motion);

        locks.release_all(&mut motor);
        assert!(!locks.any());
        assert!(!motor.rotation_locked);
        assert!(!motor.item_switch_locked);
        assert!(!motor.root_motion);
        assert!(!motor.fall_prevention);
    }
}
