//! Rope Swing demo driver
//!
//! Runs a scripted aim, throw, swing and jump sequence against the headless
//! platform with a fixed-timestep accumulator, logging what happens.
//! Pass a settings JSON path as the first argument to override the tuning.
//! Set `RUST_LOG=info` (or `debug`/`trace`) to see the session.

use glam::{Vec2, Vec3};

use rope_swing::consts::{MAX_SUBSTEPS, SIM_DT};
use rope_swing::platform::{AnimationLog, CharacterMotor, GroundRegion, KinematicCharacter};
use rope_swing::renderer::{LineVertex, as_bytes, colors, rope_line_vertices};
use rope_swing::sim::{Shape, StaticWorld, SwingController, SwingPhase, SwingSystem, TickInput};
use rope_swing::{Result, SwingSettings};

type Controller = SwingController<KinematicCharacter, AnimationLog, StaticWorld>;

/// Display frame time; not a multiple of the sim step so substeps vary
const FRAME_DT: f32 = 1.0 / 45.0;
const DEMO_SECONDS: f32 = 10.0;
const WALK_SPEED: f32 = 3.0;
/// Ticks spent swinging before jumping off
const SWING_TICKS: u32 = 90;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("demo failed: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => SwingSettings::load(path)?,
        None => SwingSettings::default(),
    };
    let gravity = settings.gravity;
    let rope_width = settings.rope_radius;
    let crosshair_size = settings.crosshair_size;

    let mut controller: Controller = SwingController::builder(settings)
        .motor(demo_character())
        .animator(AnimationLog::new())
        .world(demo_world())
        .build()?;
    controller.subscribe(|event| log::info!("event: {:?}", event));

    let mut script = Script::default();
    let mut accumulator = 0.0;
    let mut elapsed = 0.0;
    let mut ticks = 0u64;

    while elapsed < DEMO_SECONDS {
        accumulator += FRAME_DT;
        elapsed += FRAME_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = script.next_input(&controller);
            controller.tick(&input, SIM_DT);

            // Host locomotion runs whenever the swing is not moving the body
            if controller.phase() == SwingPhase::GroundedAnchoring {
                controller.motor_mut().velocity.z = WALK_SPEED;
            }
            if !controller.owns_motion() {
                controller.motor_mut().step(SIM_DT, gravity);
            }

            controller.drain_events();
            accumulator -= SIM_DT;
            substeps += 1;
            ticks += 1;
        }

        let hook = rope_line_vertices(controller.hook_rope(), rope_width, colors::HOOK_ROPE);
        let hold = rope_line_vertices(controller.hold_rope(), rope_width, colors::HOLD_ROPE);
        let crosshair: Vec<LineVertex> = controller
            .aim_indicator()
            .map(|p| LineVertex::new(p, crosshair_size, colors::CROSSHAIR))
            .into_iter()
            .collect();
        log::trace!(
            "frame {:.2}s: {:?}, hook rope {:.2} m, upload {} + {} + {} bytes",
            elapsed,
            controller.phase(),
            controller.hook_rope().current_length(),
            as_bytes(&hook).len(),
            as_bytes(&hold).len(),
            as_bytes(&crosshair).len()
        );
    }

    let body = controller.motor();
    log::info!(
        "demo finished after {} ticks: phase {:?}, body at {:?}, grounded {:?}",
        ticks,
        controller.phase(),
        body.position(),
        body.is_grounded()
    );
    if let Some(plan) = controller.last_landing() {
        log::info!(
            "landing hand-off: vertical {:.2}, planar {:?}, clip {:?}",
            plan.vertical,
            plan.planar,
            plan.clip
        );
    }
    log::info!(
        "animation requests: {} crossfades",
        controller.animator().crossfades.len()
    );
    Ok(())
}

/// Ledge the character starts on, a beam holding the anchor, and a lower
/// platform to land on
fn demo_world() -> StaticWorld {
    let mut world = StaticWorld::new();
    world.add_collider(Shape::Cuboid {
        center: Vec3::new(0.0, -0.5, -5.0),
        half_extents: Vec3::new(5.0, 0.5, 5.0),
    });
    world.add_collider(Shape::Capsule {
        a: Vec3::new(-4.0, 7.3, 4.0),
        b: Vec3::new(4.0, 7.3, 4.0),
        radius: 0.2,
    });
    world.add_collider(Shape::Cuboid {
        center: Vec3::new(0.0, -6.5, 16.0),
        half_extents: Vec3::new(6.0, 0.5, 6.0),
    });
    world.add_anchor(Vec3::new(0.0, 7.0, 4.0));
    world
}

fn demo_character() -> KinematicCharacter {
    KinematicCharacter::new(Vec3::new(0.0, 0.0, -2.0))
        .with_ground(GroundRegion::new(
            Vec2::new(-5.0, -10.0),
            Vec2::new(5.0, 0.0),
            0.0,
        ))
        .with_ground(GroundRegion::new(
            Vec2::new(-6.0, 10.0),
            Vec2::new(6.0, 22.0),
            -6.0,
        ))
}

/// Scripted player input keyed off the controller phase
#[derive(Debug, Default)]
struct Script {
    committed: bool,
    swing_ticks: u32,
}

impl Script {
    fn next_input(&mut self, controller: &Controller) -> TickInput {
        let mut input = TickInput {
            view_forward: Vec3::Z,
            ..Default::default()
        };
        match controller.phase() {
            SwingPhase::Idle | SwingPhase::Aiming if !self.committed => {
                input.hook_held = true;
                if controller.aim_indicator().is_some() {
                    input.commit = true;
                    self.committed = true;
                }
            }
            SwingPhase::Swinging | SwingPhase::Climbing => {
                self.swing_ticks += 1;
                // Pump forward, then let go
                input.direction_axis = Vec2::new(0.0, 1.0);
                input.jump_edge = self.swing_ticks == SWING_TICKS;
            }
            _ => {}
        }
        input
    }
}
