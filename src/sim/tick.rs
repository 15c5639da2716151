//! Fixed timestep swing controller
//!
//! A resumable state machine advanced by [`SwingSystem::tick`]. Each phase
//! that spans several ticks keeps its progress in controller fields (phase
//! timer, rotation budget) instead of suspending.

use glam::{Vec2, Vec3};

use super::collision::deflect_velocity;
use super::pendulum::{
    self, Bob, ClimbDirection, LandingPlan, Pendulum, PendulumParams, blend_parameters,
    plan_landing,
};
use super::rope::{ChainParams, RopeChain, RopeMode, RopeState};
use super::state::{MotorLocks, SwingEvent, SwingPhase, SwingSession};
use super::throw::ThrowAnimator;
use crate::consts::{EPSILON, UP};
use crate::error::{Result, SwingError};
use crate::platform::{
    AnchorScanner, AnimationDriver, BodyMask, CharacterMotor, Environment, SwingClip,
};
use crate::settings::SwingSettings;
use crate::{angle_between_deg, horizontal, rotate_towards};

/// Facing counts as aligned within this angle (degrees)
const ALIGNED_DEG: f32 = 0.1;
/// `rotate_speed` times this is the turn rate in degrees per second
const ROTATE_RATE_SCALE: f32 = 50.0;
/// Slack on timer comparisons so accumulated frame times hit their tick
const TIMER_EPSILON: f32 = 1e-5;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Hook button held (aiming)
    pub hook_held: bool,
    /// Confirm the throw at the detected anchor
    pub commit: bool,
    /// Release pressed this tick
    pub hook_release_edge: bool,
    /// Climb modifier held (vertical input climbs instead of steering)
    pub climb_modifier_held: bool,
    /// Movement axis: x right, y forward
    pub direction_axis: Vec2,
    /// Jump pressed this tick
    pub jump_edge: bool,
    /// Camera forward
    pub view_forward: Vec3,
    /// Another system took over; abort any throw in progress
    pub interrupt: bool,
}

/// A system advanced once per fixed tick with explicit phase hooks
pub trait SwingSystem {
    fn tick(&mut self, input: &TickInput, dt: f32);
    fn enter_phase(&mut self, phase: SwingPhase);
    fn exit_phase(&mut self, phase: SwingPhase);
}

/// Event subscriber
pub type EventCallback = Box<dyn FnMut(SwingEvent)>;

/// Collects collaborators for a [`SwingController`]
pub struct SwingControllerBuilder<M, A, W> {
    settings: SwingSettings,
    motor: Option<M>,
    animator: Option<A>,
    world: Option<W>,
}

impl<M, A, W> SwingControllerBuilder<M, A, W>
where
    M: CharacterMotor,
    A: AnimationDriver,
    W: Environment + AnchorScanner,
{
    pub fn new(settings: SwingSettings) -> Self {
        Self {
            settings,
            motor: None,
            animator: None,
            world: None,
        }
    }

    pub fn motor(mut self, motor: M) -> Self {
        self.motor = Some(motor);
        self
    }

    pub fn animator(mut self, animator: A) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn world(mut self, world: W) -> Self {
        self.world = Some(world);
        self
    }

    /// Validate settings and assemble the controller
    pub fn build(self) -> Result<SwingController<M, A, W>> {
        self.settings.validate()?;
        let motor = self.motor.ok_or(SwingError::MissingCollaborator("motor"))?;
        let animator = self
            .animator
            .ok_or(SwingError::MissingCollaborator("animator"))?;
        let world = self.world.ok_or(SwingError::MissingCollaborator("world"))?;
        Ok(SwingController::assemble(self.settings, motor, animator, world))
    }
}

/// Rope swing state machine
///
/// Owns the swing session, both rope chains and the throw animator. The
/// character, animation and world are injected collaborators.
pub struct SwingController<M, A, W> {
    settings: SwingSettings,
    pendulum: PendulumParams,
    motor: M,
    animator: A,
    world: W,

    phase: SwingPhase,
    previous_phase: SwingPhase,
    /// Seconds spent in the current phase
    phase_time: f32,
    session: Option<SwingSession>,
    indicator: Option<Vec3>,

    hook_rope: RopeChain,
    hold_rope: RopeChain,
    throw: ThrowAnimator,
    locks: MotorLocks,

    hook_available: bool,
    throws_enabled: bool,

    rotate_target: Vec3,
    rotate_initial_deg: f32,
    rotate_budget_deg: f32,
    climb: Option<ClimbDirection>,
    landing: Option<LandingPlan>,

    subscribers: Vec<EventCallback>,
    events: Vec<SwingEvent>,
}

impl<M, A, W> SwingController<M, A, W>
where
    M: CharacterMotor,
    A: AnimationDriver,
    W: Environment + AnchorScanner,
{
    pub fn builder(settings: SwingSettings) -> SwingControllerBuilder<M, A, W> {
        SwingControllerBuilder::new(settings)
    }

    fn assemble(settings: SwingSettings, motor: M, animator: A, world: W) -> Self {
        Self {
            pendulum: PendulumParams::from_settings(&settings),
            hook_rope: RopeChain::new(ChainParams::hook(&settings)),
            hold_rope: RopeChain::new(ChainParams::hold(&settings)),
            settings,
            motor,
            animator,
            world,
            phase: SwingPhase::Idle,
            previous_phase: SwingPhase::Idle,
            phase_time: 0.0,
            session: None,
            indicator: None,
            throw: ThrowAnimator::new(),
            locks: MotorLocks::default(),
            hook_available: true,
            throws_enabled: true,
            rotate_target: Vec3::Z,
            rotate_initial_deg: 0.0,
            rotate_budget_deg: 0.0,
            climb: None,
            landing: None,
            subscribers: Vec::new(),
            events: Vec::new(),
        }
    }

    // === Queries ===

    pub fn phase(&self) -> SwingPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&SwingSession> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &SwingSettings {
        &self.settings
    }

    /// Rope from the hand to the anchor
    pub fn hook_rope(&self) -> &RopeChain {
        &self.hook_rope
    }

    /// Short rope from the body to the hand
    pub fn hold_rope(&self) -> &RopeChain {
        &self.hold_rope
    }

    /// Where to draw the crosshair, if an anchor is targeted
    pub fn aim_indicator(&self) -> Option<Vec3> {
        self.indicator
    }

    /// False during the retract cooldown
    pub fn throws_enabled(&self) -> bool {
        self.throws_enabled
    }

    pub fn hook_available(&self) -> bool {
        self.hook_available
    }

    /// Whether the controller is moving the body this tick
    ///
    /// Hosts should skip their own locomotion while this is true.
    pub fn owns_motion(&self) -> bool {
        self.phase.owns_motion()
    }

    pub fn locks(&self) -> MotorLocks {
        self.locks
    }

    /// Momentum handed off by the most recent airborne release
    pub fn last_landing(&self) -> Option<&LandingPlan> {
        self.landing.as_ref()
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }

    pub fn motor_mut(&mut self) -> &mut M {
        &mut self.motor
    }

    pub fn animator(&self) -> &A {
        &self.animator
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    // === Events ===

    /// Register a callback invoked for every event
    pub fn subscribe<F: FnMut(SwingEvent) + 'static>(&mut self, callback: F) {
        self.subscribers.push(Box::new(callback));
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SwingEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: SwingEvent) {
        log::debug!("event {:?}", event);
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
        self.events.push(event);
    }

    // === Commands ===

    /// Abort whatever is in progress and return to Idle
    ///
    /// Detaches both ropes and restores every held motor lock. Returns false
    /// when there was nothing to cancel.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.phase, SwingPhase::Idle | SwingPhase::Retracting) {
            return false;
        }
        log::debug!("cancelling swing in {:?}", self.phase);
        let swinging = self.phase.owns_motion();
        self.release_ropes();
        self.locks.release_all(&mut self.motor);
        if swinging {
            self.emit(SwingEvent::SwingEnded);
        }
        self.transition(SwingPhase::Idle);
        true
    }

    /// Grant or remove the hook capability
    ///
    /// Removing it disposes both ropes and cancels any session.
    pub fn set_hook_available(&mut self, available: bool) {
        if !available {
            self.cancel();
            self.throw.cancel(&mut self.hook_rope);
            self.hook_rope.dispose();
            self.hold_rope.dispose();
        }
        if available != self.hook_available {
            log::info!("hook {}", if available { "available" } else { "removed" });
        }
        self.hook_available = available;
    }

    // === Internals ===

    fn transition(&mut self, to: SwingPhase) {
        if to == self.phase {
            return;
        }
        let from = self.phase;
        self.exit_phase(from);
        log::info!("swing phase {:?} -> {:?}", from, to);
        self.previous_phase = from;
        self.phase = to;
        self.phase_time = 0.0;
        self.enter_phase(to);
    }

    /// Ground contact; missing data counts as airborne
    fn grounded(&self) -> bool {
        self.motor.is_grounded().unwrap_or_else(|| {
            log::warn!("ground data unavailable, treating as airborne");
            false
        })
    }

    fn release_ropes(&mut self) {
        self.throw.cancel(&mut self.hook_rope);
        self.hook_rope.reset();
        self.hold_rope.reset();
    }

    fn retract(&mut self) {
        log::info!("rope retracted");
        self.transition(SwingPhase::Retracting);
    }

    fn crossfade(&mut self, clip: SwingClip, mask: BodyMask) {
        self.animator
            .crossfade(clip, self.settings.crossfade_time, mask);
    }

    /// Lay out both chains for a throw from the hand to the pivot
    fn launch_hook(&mut self, pivot: Vec3) -> Result<()> {
        let hand = self.motor.hand_position();
        let body = self.motor.body_attach_position();
        self.hook_rope.initialize(
            hand,
            pivot,
            self.settings.rope_resolution,
            hand.distance(pivot),
        )?;
        self.hold_rope.initialize(
            body,
            hand,
            self.settings.hold_rope_resolution,
            body.distance(hand) + self.settings.hold_rope_slack,
        )?;
        self.throw.start_throw(
            &mut self.hook_rope,
            hand,
            pivot,
            self.settings.throw_height,
            self.settings.throw_duration,
        );
        Ok(())
    }

    fn tick_idle(&mut self, input: &TickInput) {
        if input.hook_held && self.hook_available && self.throws_enabled {
            self.transition(SwingPhase::Aiming);
            self.tick_aiming(input);
        }
    }

    fn tick_aiming(&mut self, input: &TickInput) {
        if !self.hook_available || !self.throws_enabled {
            self.transition(SwingPhase::Idle);
            return;
        }

        let hand = self.motor.hand_position();
        let target = self.world.scan_for_anchor(
            self.settings.max_reach(),
            self.settings.min_distance,
            hand,
            input.view_forward,
        );
        let pull_back = input.view_forward.normalize_or_zero() * self.settings.crosshair_size;
        self.indicator = target.map(|hit| hit.position - pull_back);

        if input.commit {
            if let Some(hit) = target {
                self.session = Some(SwingSession::new(hit, hand));
                self.transition(SwingPhase::Rotating);
                return;
            }
        }
        if !input.hook_held {
            self.transition(SwingPhase::Idle);
        }
    }

    fn tick_rotating(&mut self, dt: f32) {
        let facing = self.motor.facing();
        let remaining = angle_between_deg(facing, self.rotate_target);
        if remaining <= ALIGNED_DEG || self.rotate_budget_deg >= self.rotate_initial_deg {
            self.motor.set_facing(self.rotate_target);
            self.transition(SwingPhase::Throwing);
            return;
        }

        let step_deg = self.settings.rotate_speed * dt * ROTATE_RATE_SCALE;
        self.motor
            .set_facing(rotate_towards(facing, self.rotate_target, step_deg.to_radians()));
        self.rotate_budget_deg += step_deg;
    }

    fn tick_throwing(&mut self) {
        if self.phase_time < self.settings.throw_windup - TIMER_EPSILON {
            return;
        }
        let Some(pivot) = self.session.as_ref().map(|s| s.pivot) else {
            log::warn!("throw without a session");
            self.cancel();
            return;
        };
        match self.launch_hook(pivot) {
            Ok(()) => self.transition(SwingPhase::AttachPending),
            Err(err) => {
                log::warn!("cannot throw hook: {}", err);
                self.cancel();
            }
        }
    }

    fn tick_attach_pending(&mut self, dt: f32) {
        let to_hook = horizontal(self.throw.destination() - self.motor.position());
        if to_hook.length_squared() > EPSILON {
            self.motor.set_facing(to_hook);
        }
        self.throw.tick(&mut self.hook_rope, dt);
        if self.throw.has_reached_target() {
            self.transition(SwingPhase::GroundedAnchoring);
        }
    }

    fn tick_grounded_anchoring(&mut self, input: &TickInput) {
        let grounded = self.grounded();
        let hand = self.motor.hand_position();
        let (min, max, margin) = (
            self.settings.min_distance,
            self.settings.rope_length,
            self.settings.grounded_swing_margin,
        );
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.last_displacement = hand - session.prev_position;
        session.prev_position = hand;
        let length = hand.distance(session.pivot);
        session.current_length = length;

        let next = if grounded {
            session.grounded_length = length;
            (length < min || length >= max || input.hook_release_edge)
                .then_some(SwingPhase::Retracting)
        } else {
            (length > session.grounded_length + margin).then_some(SwingPhase::Swinging)
        };

        match next {
            Some(SwingPhase::Retracting) => self.retract(),
            Some(phase) => self.transition(phase),
            None => {}
        }
    }

    fn tick_swing(&mut self, input: &TickInput, dt: f32) {
        if input.jump_edge || self.grounded() {
            self.transition(SwingPhase::Landing);
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let settings = &self.settings;
        let motor = &mut self.motor;

        // Climbing
        let vertical = input.direction_axis.y;
        let mut next = None;
        match self.phase {
            SwingPhase::Swinging => {
                session.low_velocity = pendulum::is_low_velocity(
                    session.rope_angle_deg(),
                    session.apex_angle_deg(),
                    settings.climb_angle_threshold_deg,
                );
                if session.low_velocity && input.climb_modifier_held {
                    if let Some(direction) =
                        pendulum::climb_direction(vertical, session.current_length, settings)
                    {
                        self.climb = Some(direction);
                        next = Some(SwingPhase::Climbing);
                    }
                }
            }
            SwingPhase::Climbing => {
                let (min, max) = (settings.min_distance, settings.rope_length);
                session.current_length = pendulum::climb_length(
                    session.current_length,
                    vertical,
                    settings.climb_speed,
                    dt,
                    min,
                    max,
                );
                let at_bound = session.current_length <= min || session.current_length >= max;
                if !input.climb_modifier_held || at_bound {
                    next = Some(SwingPhase::Swinging);
                }
            }
            _ => {}
        }

        // Facing follows the camera unless descending
        if !session.descending {
            if let Some(target) = horizontal(input.view_forward).try_normalize() {
                let max_turn = settings.swing_rotation_speed.to_radians() * dt;
                motor.set_facing(rotate_towards(motor.facing(), target, max_turn));
            }
        }

        // Steering
        let steer_axis = if input.climb_modifier_held {
            Vec2::ZERO
        } else {
            input.direction_axis
        };
        session.steer_direction =
            pendulum::steer_toward(session.steer_direction, steer_axis, input.view_forward, dt);
        if pendulum::steering_allowed(
            session.rope_angle_deg(),
            session.steer_direction,
            session.velocity,
            settings,
        ) {
            session.velocity += session.steer_direction * settings.swing_force * dt;
        }

        // Constrained integration about the pivot
        let hand = motor.hand_position();
        let step = Pendulum::new(session.pivot, session.current_length).step(
            Bob {
                position: hand,
                velocity: session.velocity,
                previous_velocity: session.previous_velocity,
            },
            session.steer_direction.length_squared() < EPSILON,
            &self.pendulum,
            dt,
        );
        if let Some(apex) = step.apex {
            session.apex = apex;
        }
        session.rope_vector = step.rope_vector;
        session.previous_velocity = step.velocity;
        let mut velocity = step.velocity;

        // Body collision
        let radius = motor.collider_radius();
        if let Some(direction) = velocity.try_normalize() {
            if let Some(hit) = self.world.sphere_cast(
                motor.hip_position(),
                radius,
                direction,
                radius,
                motor.collider_id(),
            ) {
                velocity = deflect_velocity(velocity, hit.normal, settings.collision_friction);
                let push = (motor.position() - hit.point).normalize_or_zero();
                motor.move_by(push * velocity.length() * dt);
                log::trace!("swing contact with {:?}", hit.collider);
            }
        }
        session.velocity = velocity;
        motor.move_by(velocity * dt);

        let moved = motor.hand_position();
        session.descending = moved.y < hand.y;
        session.last_displacement = moved - hand;
        session.prev_position = moved;

        let blend = blend_parameters(
            session.rest_point(),
            session.current_length,
            moved,
            motor.facing(),
            settings,
        );
        self.animator.set_parameter("x", blend.x);
        self.animator.set_parameter("y", blend.y);
        self.hook_rope.set_target_length(session.current_length);

        if let Some(phase) = next {
            self.transition(phase);
        }
    }

    /// Keep rope ends on the body and advance both chains
    fn update_ropes(&mut self, dt: f32) {
        let hand = self.motor.hand_position();
        let exclude = self.motor.collider_id();

        if self.hook_rope.is_active() {
            self.hook_rope.set_start_anchor(hand);
            self.hook_rope.step(dt, &self.world, exclude);
        }
        if self.hold_rope.is_active() {
            let body = self.motor.body_attach_position();
            self.hold_rope.set_anchors(body, hand);
            self.hold_rope
                .set_target_length(body.distance(hand) + self.settings.hold_rope_slack);
            self.hold_rope.step(dt, &self.world, exclude);
        }
    }

    fn enter_landing(&mut self) {
        let grounded = self.grounded();
        let hand = self.motor.hand_position();
        let plan = self.session.as_ref().map(|s| {
            let play_land = !s.low_velocity && !s.descending;
            plan_landing(
                s.pivot,
                s.current_length,
                hand,
                s.apex,
                s.velocity,
                play_land,
                &self.settings,
            )
        });

        self.release_ropes();
        self.locks.release_all(&mut self.motor);
        self.emit(SwingEvent::SwingEnded);
        self.crossfade(SwingClip::HookHolding, BodyMask::RightHand);

        match plan {
            Some(plan) if !grounded => {
                self.motor.set_facing(plan.direction);
                self.crossfade(plan.clip, BodyMask::FullBody);
                self.motor.set_velocity(plan.vertical, plan.planar);
                log::debug!(
                    "landing hand-off: vertical {:.2} planar {:.2}",
                    plan.vertical,
                    plan.planar.length()
                );
                self.landing = Some(plan);
            }
            _ => {
                self.crossfade(SwingClip::LandAndStepForward, BodyMask::FullBody);
                self.motor.set_velocity(0.0, Vec3::ZERO);
                self.landing = None;
            }
        }
    }

    fn enter_swinging(&mut self) {
        if self.previous_phase == SwingPhase::Climbing {
            self.hook_rope.set_state(RopeState::Swinging);
            return;
        }

        self.locks.set_fall_prevention(&mut self.motor, true);
        let hand = self.motor.hand_position();
        let (min, max) = (self.settings.min_distance, self.settings.rope_length);
        let (slack, force) = (self.settings.swing_length_slack, self.settings.swing_force);
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.current_length += slack;
        session.clamp_length(min, max);
        session.velocity = horizontal(session.last_displacement).normalize_or_zero() * force;
        session.previous_velocity = session.velocity;
        session.rope_vector = -UP * session.current_length;
        session.apex = hand;
        session.steer_direction = Vec3::ZERO;
        let length = session.current_length;

        self.hook_rope.set_state(RopeState::Swinging);
        self.hook_rope.set_target_length(length);
        self.crossfade(SwingClip::SwingActions, BodyMask::FullBody);
        self.emit(SwingEvent::SwingStarted);
    }
}

impl<M, A, W> SwingSystem for SwingController<M, A, W>
where
    M: CharacterMotor,
    A: AnimationDriver,
    W: Environment + AnchorScanner,
{
    /// Advance the controller by one fixed timestep
    fn tick(&mut self, input: &TickInput, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.phase_time += dt;

        if input.interrupt && self.phase.interruptible() {
            log::debug!("interrupted during {:?}", self.phase);
            self.cancel();
            return;
        }

        match self.phase {
            SwingPhase::Idle => self.tick_idle(input),
            SwingPhase::Aiming => self.tick_aiming(input),
            SwingPhase::Rotating => self.tick_rotating(dt),
            SwingPhase::Throwing => self.tick_throwing(),
            SwingPhase::AttachPending => self.tick_attach_pending(dt),
            SwingPhase::GroundedAnchoring => self.tick_grounded_anchoring(input),
            SwingPhase::Swinging | SwingPhase::Climbing => self.tick_swing(input, dt),
            SwingPhase::Landing => {
                if self.phase_time >= self.settings.landing_window - TIMER_EPSILON {
                    self.transition(SwingPhase::Idle);
                }
            }
            SwingPhase::Retracting => {
                if self.phase_time >= self.settings.retract_cooldown - TIMER_EPSILON {
                    self.transition(SwingPhase::Idle);
                }
            }
        }

        self.update_ropes(dt);
    }

    fn enter_phase(&mut self, phase: SwingPhase) {
        match phase {
            SwingPhase::Idle => {
                self.session = None;
                self.indicator = None;
                self.climb = None;
            }
            SwingPhase::Aiming => {}
            SwingPhase::Rotating => {
                self.locks.set_rotation(&mut self.motor, true);
                self.locks.set_item_switch(&mut self.motor, true);
                let facing = self.motor.facing();
                self.rotate_target = self
                    .session
                    .as_ref()
                    .and_then(|s| horizontal(s.anchor.approach_direction).try_normalize())
                    .unwrap_or(facing);
                self.rotate_initial_deg = angle_between_deg(facing, self.rotate_target);
                self.rotate_budget_deg = 0.0;
            }
            SwingPhase::Throwing => {
                self.indicator = None;
                self.emit(SwingEvent::RopeReleased);
                self.crossfade(SwingClip::RopeThrow, BodyMask::Arm);
            }
            SwingPhase::AttachPending => {}
            SwingPhase::GroundedAnchoring => {
                self.hook_rope.set_state(RopeState::Normal);
                self.hook_rope.set_mode(RopeMode::Rigid);
                self.emit(SwingEvent::RopeHooked);
                self.locks.set_rotation(&mut self.motor, false);
                self.locks.set_fall_prevention(&mut self.motor, false);
                let hand = self.motor.hand_position();
                if let Some(session) = self.session.as_mut() {
                    session.grounded_length = hand.distance(session.pivot);
                    session.prev_position = hand;
                    session.last_displacement = Vec3::ZERO;
                }
            }
            SwingPhase::Swinging => self.enter_swinging(),
            SwingPhase::Climbing => {
                self.hook_rope.set_state(RopeState::Climbing);
                self.locks.set_root_motion(&mut self.motor, true);
                let clip = self.climb.unwrap_or(ClimbDirection::Up).clip();
                self.crossfade(clip, BodyMask::FullBody);
            }
            SwingPhase::Landing => self.enter_landing(),
            SwingPhase::Retracting => {
                self.release_ropes();
                self.locks.release_all(&mut self.motor);
                self.session = None;
                self.indicator = None;
                self.throws_enabled = false;
                self.crossfade(SwingClip::HookHolding, BodyMask::RightHand);
            }
        }
    }

    fn exit_phase(&mut self, phase: SwingPhase) {
        match phase {
            SwingPhase::Climbing => {
                if self.locks.root_motion {
                    self.locks.set_root_motion(&mut self.motor, false);
                }
                self.climb = None;
            }
            SwingPhase::Retracting => {
                self.throws_enabled = true;
                log::debug!("throws re-enabled");
            }
            _ => {}
        }
    }
}
