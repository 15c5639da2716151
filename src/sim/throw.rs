//! Hook throw animation
//!
//! Flies the far end of a rope chain along a parabola from the hand to the
//! anchor over a fixed wall-clock duration, paying out rope as it goes.

use glam::Vec3;

use super::rope::{RopeChain, RopeState};
use crate::consts::UP;

/// Completion slack so accumulated frame times land on the final tick
const COMPLETION_EPSILON: f32 = 1e-5;

/// Point on the throw arc at `t` in [0, 1]
///
/// `lerp(origin, destination, t) + up * apex_height * 4t(1-t)`
#[inline]
pub fn parabola(origin: Vec3, destination: Vec3, apex_height: f32, t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    origin.lerp(destination, t) + UP * apex_height * 4.0 * t * (1.0 - t)
}

/// Drives a chain's end anchor through a throw
#[derive(Debug, Clone, Default)]
pub struct ThrowAnimator {
    origin: Vec3,
    destination: Vec3,
    apex_height: f32,
    duration: f32,
    elapsed: f32,
    final_length: f32,
    in_flight: bool,
}

impl ThrowAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a throw; the chain is marked `Throwing` until the hook lands
    pub fn start_throw(
        &mut self,
        chain: &mut RopeChain,
        origin: Vec3,
        destination: Vec3,
        apex_height: f32,
        duration: f32,
    ) {
        self.origin = origin;
        self.destination = destination;
        self.apex_height = apex_height;
        self.duration = duration;
        self.elapsed = 0.0;
        self.final_length = origin.distance(destination);
        self.in_flight = true;

        chain.set_state(RopeState::Throwing);
        chain.set_anchors(origin, origin);
        chain.set_target_length(0.0);
        log::debug!(
            "throw started: {:.2}m over {:.2}s",
            self.final_length,
            self.duration
        );

        if duration <= 0.0 {
            log::warn!("throw with non-positive duration {}, landing immediately", duration);
            self.finish(chain);
        }
    }

    /// Advance the flight by `dt` seconds of wall-clock time
    ///
    /// Returns the hook position while in flight or on the landing tick.
    pub fn tick(&mut self, chain: &mut RopeChain, dt: f32) -> Option<Vec3> {
        if !self.in_flight {
            return None;
        }

        self.elapsed += dt;
        if self.elapsed >= self.duration - COMPLETION_EPSILON {
            self.finish(chain);
            return Some(self.destination);
        }

        let t = self.progress();
        let hook = parabola(self.origin, self.destination, self.apex_height, t);
        chain.set_end_anchor(hook);
        chain.set_target_length(self.final_length * t);
        Some(hook)
    }

    /// Abort the flight; returns false when nothing was in flight
    pub fn cancel(&mut self, chain: &mut RopeChain) -> bool {
        if !self.in_flight {
            return false;
        }
        log::debug!("throw cancelled at {:.0}%", self.progress() * 100.0);
        self.finish(chain);
        true
    }

    fn finish(&mut self, chain: &mut RopeChain) {
        self.in_flight = false;
        if chain.state() == RopeState::Throwing {
            chain.set_state(RopeState::Normal);
        }
        chain.set_end_anchor(self.destination);
        chain.set_target_length(self.final_length);
    }

    /// True once the in-flight marker is cleared, by landing or by cancellation
    pub fn has_reached_target(&self) -> bool {
        !self.in_flight
    }

    /// Flight progress in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Current hook position
    pub fn hook_position(&self) -> Vec3 {
        if self.in_flight {
            parabola(self.origin, self.destination, self.apex_height, self.progress())
        } else {
            self.destination
        }
    }

    pub fn destination(&self) -> Vec3 {
        self.destination
    }
}
