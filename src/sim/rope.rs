//! Verlet rope chain
//!
//! An ordered chain of point masses between two moving anchors. In `Free`
//! mode every interior point is integrated under gravity, bounced off the
//! environment, relaxed toward an even segment length and smoothed. In
//! `Rigid` mode the chain is a straight line pinned between its anchors and
//! the swing integrator owns the physics.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::{ColliderId, first_rope_contact, rope_point_response};
use crate::consts::{EPSILON, ROPE_GRAVITY};
use crate::error::{Result, SwingError};
use crate::platform::Environment;
use crate::settings::SwingSettings;

/// Simulation authority over the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RopeMode {
    /// Full per-point simulation
    #[default]
    Free,
    /// Straight line pinned between the anchors
    Rigid,
}

/// What the rope is currently being used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RopeState {
    #[default]
    Normal,
    /// Hook in flight; cleared when the throw lands or is cancelled
    Throwing,
    Swinging,
    Climbing,
}

/// Per-chain solver parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainParams {
    /// Velocity loss per step and on bounce (0-1)
    pub dampening: f32,
    /// Blend toward neighbour midpoint (0-1)
    pub smoothing_factor: f32,
    pub constraint_iterations: usize,
    /// Radius of the sphere tested around each point
    pub collider_radius: f32,
    pub gravity: Vec3,
    /// Scale on each distance correction
    pub stiffness: f32,
    /// Whether points are tested against the environment
    pub collides: bool,
}

impl ChainParams {
    /// Parameters for the rope between hand and anchor
    pub fn hook(settings: &SwingSettings) -> Self {
        Self {
            dampening: settings.rope_dampening,
            smoothing_factor: settings.smoothing_factor,
            constraint_iterations: settings.constraint_iterations,
            collider_radius: settings.rope_collider_radius,
            gravity: ROPE_GRAVITY,
            stiffness: 1.0,
            collides: true,
        }
    }

    /// Parameters for the short rope between body and hand
    pub fn hold(settings: &SwingSettings) -> Self {
        Self {
            stiffness: settings.hold_rope_stiffness,
            collides: false,
            ..Self::hook(settings)
        }
    }
}

/// A simulated point mass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RopePoint {
    pub position: Vec3,
    pub previous: Vec3,
    pub velocity: Vec3,
}

impl RopePoint {
    fn at_rest(position: Vec3) -> Self {
        Self {
            position,
            previous: position,
            velocity: Vec3::ZERO,
        }
    }
}

/// A rope of point masses between two anchors
#[derive(Debug, Clone)]
pub struct RopeChain {
    points: Vec<RopePoint>,
    start_anchor: Vec3,
    end_anchor: Vec3,
    target_length: f32,
    mode: RopeMode,
    state: RopeState,
    params: ChainParams,
}

impl RopeChain {
    /// Create an inert chain (no points until [`RopeChain::initialize`])
    pub fn new(params: ChainParams) -> Self {
        Self {
            points: Vec::new(),
            start_anchor: Vec3::ZERO,
            end_anchor: Vec3::ZERO,
            target_length: 0.0,
            mode: RopeMode::Free,
            state: RopeState::Normal,
            params,
        }
    }

    /// Lay out `resolution` points in a straight line between the anchors
    pub fn initialize(
        &mut self,
        point_a: Vec3,
        point_b: Vec3,
        resolution: usize,
        target_length: f32,
    ) -> Result<()> {
        if resolution < 2 {
            return Err(SwingError::InvalidResolution(resolution));
        }
        if point_a.distance_squared(point_b) < EPSILON * EPSILON {
            return Err(SwingError::degenerate(point_a));
        }

        self.points = (0..resolution)
            .map(|i| {
                let t = i as f32 / (resolution - 1) as f32;
                RopePoint::at_rest(point_a.lerp(point_b, t))
            })
            .collect();
        self.start_anchor = point_a;
        self.end_anchor = point_b;
        self.target_length = target_length.max(0.0);
        self.mode = RopeMode::Free;
        log::debug!(
            "rope initialized: {} points, target length {:.2}",
            resolution,
            self.target_length
        );
        Ok(())
    }

    /// Whether the chain currently has points
    pub fn is_active(&self) -> bool {
        !self.points.is_empty()
    }

    pub fn resolution(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[RopePoint] {
        &self.points
    }

    /// Point positions in order from start to end anchor
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points.iter().map(|p| p.position)
    }

    /// Points a renderer should draw: two in `Rigid` mode, all otherwise
    pub fn line_points(&self) -> Vec<Vec3> {
        match (self.mode, self.points.first(), self.points.last()) {
            (_, None, _) | (_, _, None) => Vec::new(),
            (RopeMode::Rigid, Some(first), Some(last)) => vec![first.position, last.position],
            (RopeMode::Free, _, _) => self.positions().collect(),
        }
    }

    pub fn mode(&self) -> RopeMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RopeMode) {
        if self.mode != mode {
            log::debug!("rope mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        if mode == RopeMode::Rigid {
            self.straighten();
        }
    }

    pub fn state(&self) -> RopeState {
        self.state
    }

    pub fn set_state(&mut self, state: RopeState) {
        self.state = state;
    }

    pub fn target_length(&self) -> f32 {
        self.target_length
    }

    pub fn set_target_length(&mut self, length: f32) {
        self.target_length = length.max(0.0);
    }

    /// Rest distance between adjacent points
    pub fn segment_length(&self) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.target_length / (self.points.len() - 1) as f32
    }

    /// Sum of the current segment lengths
    pub fn current_length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| w[0].position.distance(w[1].position))
            .sum()
    }

    pub fn anchors(&self) -> (Vec3, Vec3) {
        (self.start_anchor, self.end_anchor)
    }

    pub fn set_anchors(&mut self, start: Vec3, end: Vec3) {
        self.start_anchor = start;
        self.end_anchor = end;
    }

    pub fn set_start_anchor(&mut self, start: Vec3) {
        self.start_anchor = start;
    }

    pub fn set_end_anchor(&mut self, end: Vec3) {
        self.end_anchor = end;
    }

    /// Advance the chain by `dt`
    ///
    /// `exclude` is the owning character's collider, ignored by point collision.
    pub fn step(&mut self, dt: f32, environment: &dyn Environment, exclude: Option<ColliderId>) {
        if self.points.is_empty() || dt <= 0.0 {
            return;
        }

        if self.mode == RopeMode::Rigid {
            self.straighten();
            return;
        }

        self.pin_ends();
        for p in &mut self.points {
            p.previous = p.position;
        }

        self.integrate(dt, environment, exclude);
        self.relax();
        self.smooth();

        let last = self.points.len() - 1;
        for p in &mut self.points[1..last] {
            p.velocity = (p.position - p.previous) / dt;
        }
    }

    /// Gravity, collision response and damping for interior points
    fn integrate(&mut self, dt: f32, environment: &dyn Environment, exclude: Option<ColliderId>) {
        let params = self.params;
        let last = self.points.len() - 1;

        for p in &mut self.points[1..last] {
            let mut velocity = p.velocity + params.gravity * dt;

            let mut collided = false;
            if params.collides {
                let overlaps =
                    environment.overlap_sphere(p.position, params.collider_radius, exclude);
                if let Some(contact) = first_rope_contact(&overlaps) {
                    let (position, bounced) = rope_point_response(
                        velocity,
                        contact,
                        params.collider_radius,
                        params.dampening,
                    );
                    p.position = position;
                    velocity = bounced;
                    collided = true;
                }
            }

            if !collided {
                p.position += velocity * dt;
            }

            p.velocity = velocity * (1.0 - params.dampening);
        }
    }

    /// Distance constraint passes with both ends pinned
    fn relax(&mut self) {
        let segment = self.segment_length();
        let stiffness = self.params.stiffness;
        let last = self.points.len() - 1;

        for _ in 0..self.params.constraint_iterations {
            for i in 0..last {
                let delta = self.points[i + 1].position - self.points[i].position;
                let dist = delta.length();
                if dist < EPSILON {
                    continue; // Zero-length segment
                }
                let half = delta * ((dist - segment) / dist) * 0.5 * stiffness;

                match (i == 0, i + 1 == last) {
                    (true, true) => {}
                    (true, false) => self.points[i + 1].position -= half * 2.0,
                    (false, true) => self.points[i].position += half * 2.0,
                    (false, false) => {
                        self.points[i].position += half;
                        self.points[i + 1].position -= half;
                    }
                }
            }
            self.pin_ends();
        }
    }

    /// Pull interior points toward their neighbours' midpoint
    fn smooth(&mut self) {
        let factor = self.params.smoothing_factor;
        for i in 1..self.points.len() - 1 {
            let mid = (self.points[i - 1].position + self.points[i + 1].position) * 0.5;
            self.points[i].position = self.points[i].position.lerp(mid, factor);
        }
    }

    fn pin_ends(&mut self) {
        let last = self.points.len() - 1;
        self.points[0].position = self.start_anchor;
        self.points[last].position = self.end_anchor;
    }

    /// Pin the ends and lay interior points on the straight line between them
    fn straighten(&mut self) {
        if self.points.len() < 2 {
            return;
        }
        let last = self.points.len() - 1;
        let (start, end) = (self.start_anchor, self.end_anchor);
        for (i, p) in self.points.iter_mut().enumerate() {
            *p = RopePoint::at_rest(start.lerp(end, i as f32 / last as f32));
        }
        self.points[0].position = start;
        self.points[last].position = end;
    }

    /// Clear all points and return to an inert, released state
    pub fn reset(&mut self) {
        if self.is_active() {
            log::debug!("rope reset");
        }
        self.points.clear();
        self.target_length = 0.0;
        self.mode = RopeMode::Free;
        self.state = RopeState::Normal;
    }

    /// Reset and release the point buffers
    pub fn dispose(&mut self) {
        self.reset();
        self.points = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::world::{Shape, StaticWorld};
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn params() -> ChainParams {
        ChainParams::hook(&SwingSettings::default())
    }

    fn floor_world() -> StaticWorld {
        let mut world = StaticWorld::new();
        world.add_collider(Shape::Cuboid {
            center: Vec3::new(0.0, -0.5, 0.0),
            half_extents: Vec3::new(20.0, 0.5, 20.0),
        });
        world
    }

    fn max_segment_error(chain: &RopeChain) -> f32 {
        let seg = chain.segment_length();
        chain
            .points()
            .windows(2)
            .map(|w| (w[0].position.distance(w[1].position) - seg).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_initialize_rejects_bad_config() {
        let mut chain = RopeChain::new(params());
        assert!(matches!(
            chain.initialize(Vec3::ZERO, Vec3::X, 1, 1.0),
            Err(SwingError::InvalidResolution(1))
        ));
        assert!(matches!(
            chain.initialize(Vec3::ONE, Vec3::ONE, 10, 1.0),
            Err(SwingError::DegenerateChain { .. })
        ));
        assert!(!chain.is_active());
    }

    #[test]
    fn test_initialize_lays_out_colinear() {
        let mut chain = RopeChain::new(params());
        chain
            .initialize(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), 5, 4.0)
            .expect("valid chain");
        let positions: Vec<Vec3> = chain.positions().collect();
        assert_eq!(positions.len(), 5);
        for (i, p) in positions.iter().enumerate() {
            assert!((p.z - i as f32).abs() < 0.0001);
            assert_eq!(p.y, 0.0);
        }
        assert!(chain.points().iter().all(|p| p.velocity == Vec3::ZERO));
        assert!((chain.segment_length() - 1.0).abs() < 0.0001);
        assert!((chain.current_length() - 4.0).abs() < 0.0001);
    }

    #[test]
    fn test_rigid_pins_and_straightens() {
        let world = StaticWorld::new();
        let mut chain = RopeChain::new(params());
        chain
            .initialize(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), 9, 4.0)
            .expect("valid chain");
        chain.set_mode(RopeMode::Rigid);
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(1.0, 7.0, 3.0);
        chain.set_anchors(a, b);
        chain.step(DT, &world, None);
        let positions: Vec<Vec3> = chain.positions().collect();
        assert_eq!(positions[0], a);
        assert_eq!(positions[8], b);
        assert_eq!(chain.line_points(), vec![a, b]);
        // No sag while rigid
        assert!(positions.iter().all(|p| (p.x - 1.0).abs() < 0.0001));
    }

    #[test]
    fn test_free_rope_sags_under_gravity() {
        let world = StaticWorld::new();
        let mut chain = RopeChain::new(params());
        let a = Vec3::new(0.0, 5.0, 0.0);
        let b = Vec3::new(4.0, 5.0, 0.0);
        chain.initialize(a, b, 12, 6.0).expect("valid chain");
        for _ in 0..240 {
            chain.step(DT, &world, None);
        }
        let lowest = chain.positions().map(|p| p.y).fold(f32::MAX, f32::min);
        assert!(lowest < 4.0, "rope should hang below its anchors, lowest {}", lowest);
        assert!(chain.positions().all(|p| p.is_finite()));
        assert_eq!(chain.line_points().len(), 12);
    }

    #[test]
    fn test_points_rest_on_floor() {
        let world = floor_world();
        let mut chain = RopeChain::new(params());
        // Long slack rope between two low anchors drapes onto the floor
        let a = Vec3::new(0.0, 0.5, 0.0);
        let b = Vec3::new(2.0, 0.5, 0.0);
        chain.initialize(a, b, 20, 5.0).expect("valid chain");
        for _ in 0..300 {
            chain.step(DT, &world, None);
        }
        let lowest = chain.positions().map(|p| p.y).fold(f32::MAX, f32::min);
        assert!(lowest > -0.1, "rope fell through the floor: {}", lowest);
    }

    #[test]
    fn test_concave_mesh_is_ignored() {
        let mut world = StaticWorld::new();
        world.add_concave_mesh(Shape::Cuboid {
            center: Vec3::new(0.0, -0.5, 0.0),
            half_extents: Vec3::new(20.0, 0.5, 20.0),
        });
        let mut chain = RopeChain::new(params());
        chain
            .initialize(Vec3::new(0.0, 0.5, 0.0), Vec3::new(2.0, 0.5, 0.0), 20, 5.0)
            .expect("valid chain");
        for _ in 0..300 {
            chain.step(DT, &world, None);
        }
        let lowest = chain.positions().map(|p| p.y).fold(f32::MAX, f32::min);
        assert!(lowest < -0.1, "rope should pass through concave meshes: {}", lowest);
    }

    #[test]
    fn test_zero_target_length_stays_finite() {
        let world = StaticWorld::new();
        let mut chain = RopeChain::new(params());
        chain
            .initialize(Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0), 10, 0.0)
            .expect("valid chain");
        chain.set_anchors(Vec3::ZERO, Vec3::new(0.0, 0.0, 1e-3));
        for _ in 0..30 {
            chain.step(DT, &world, None);
        }
        assert!(chain.positions().all(|p| p.is_finite()));
        assert!(chain.points().iter().all(|p| p.velocity.is_finite()));
    }

    #[test]
    fn test_reset_and_dispose() {
        let mut chain = RopeChain::new(params());
        chain
            .initialize(Vec3::ZERO, Vec3::X, 4, 1.0)
            .expect("valid chain");
        chain.set_mode(RopeMode::Rigid);
        chain.set_state(RopeState::Swinging);
        chain.reset();
        assert!(!chain.is_active());
        assert_eq!(chain.mode(), RopeMode::Free);
        assert_eq!(chain.state(), RopeState::Normal);
        assert!(chain.line_points().is_empty());

        // Stepping an inert chain is a no-op
        chain.step(DT, &StaticWorld::new(), None);
        assert!(!chain.is_active());

        chain.dispose();
        assert_eq!(chain.resolution(), 0);
    }

    #[test]
    fn test_hold_params() {
        let settings = SwingSettings::default();
        let hold = ChainParams::hold(&settings);
        assert!(!hold.collides);
        assert_eq!(hold.stiffness, 0.9);
        assert!(ChainParams::hook(&settings).collides);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_settles_to_segment_length(
            resolution in 3usize..=12,
            length in 1.0f32..8.0,
            slack in 0.75f32..=1.0,
            yaw in 0.0f32..std::f32::consts::TAU,
        ) {
            let world = StaticWorld::new();
            let mut chain = RopeChain::new(params());
            let a = Vec3::new(0.0, 10.0, 0.0);
            let b = a + Vec3::new(yaw.cos(), 0.0, yaw.sin()) * length * slack;
            chain.initialize(a, b, resolution, length).expect("valid chain");
            for _ in 0..300 {
                chain.step(DT, &world, None);
            }
            let seg = chain.segment_length();
            prop_assert!(max_segment_error(&chain) <= seg * 0.05 + 1e-3);
        }

        #[test]
        fn prop_endpoints_pinned_every_step(
            resolution in 2usize..=30,
            rigid in any::<bool>(),
            moves in proptest::collection::vec(
                (-3.0f32..3.0, -3.0f32..3.0, -3.0f32..3.0), 1..20),
        ) {
            let world = floor_world();
            let mut chain = RopeChain::new(params());
            chain
                .initialize(Vec3::new(0.0, 2.0, 0.0), Vec3::new(3.0, 4.0, 0.0), resolution, 5.0)
                .expect("valid chain");
            if rigid {
                chain.set_mode(RopeMode::Rigid);
            }
            for (x, y, z) in moves {
                let start = Vec3::new(x, y + 3.0, z);
                let end = start + Vec3::new(2.0, 1.0, -1.0);
                chain.set_anchors(start, end);
                chain.step(DT, &world, None);
                let positions: Vec<Vec3> = chain.positions().collect();
                prop_assert_eq!(positions[0], start);
                prop_assert_eq!(positions[positions.len() - 1], end);
            }
        }
    }
}
