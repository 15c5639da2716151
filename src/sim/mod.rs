//! Rope and swing simulation
//!
//! Everything here is advanced explicitly with a fixed timestep:
//! - `rope`: Verlet point chains with distance constraints
//! - `throw`: parabolic hook flight
//! - `pendulum`: constrained swing integration and landing math
//! - `tick`: the swing state machine
//! - `world`, `sdf`, `collision`: reference static world and contact response

pub mod collision;
pub mod pendulum;
pub mod rope;
pub mod sdf;
pub mod state;
pub mod throw;
pub mod tick;
pub mod world;

pub use collision::{CastHit, ColliderId, Overlap, deflect_velocity, reflect_velocity};
pub use pendulum::{ClimbDirection, LandingPlan, Pendulum, PendulumParams};
pub use rope::{ChainParams, RopeChain, RopeMode, RopePoint, RopeState};
pub use state::{MotorLocks, SwingEvent, SwingPhase, SwingSession};
pub use throw::{ThrowAnimator, parabola};
pub use tick::{SwingController, SwingControllerBuilder, SwingSystem, TickInput};
pub use world::{Shape, StaticWorld};
