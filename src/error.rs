//! Error types for rope and swing setup.
//!
//! Runtime anomalies inside a tick never surface here; they degrade to safe
//! defaults. Only configuration and initialization can fail.

use thiserror::Error;

/// Errors raised while configuring ropes or building a swing controller.
#[derive(Debug, Error)]
pub enum SwingError {
    /// A chain needs at least two points.
    #[error("invalid rope resolution {0}: a chain needs at least 2 points")]
    InvalidResolution(usize),

    /// Both chain anchors coincide, so the chain has no direction.
    #[error("degenerate chain: anchors coincide at ({x}, {y}, {z})")]
    DegenerateChain {
        /// Shared anchor x.
        x: f32,
        /// Shared anchor y.
        y: f32,
        /// Shared anchor z.
        z: f32,
    },

    /// A tunable is out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A required collaborator was not supplied to the builder.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Settings file could not be read or written.
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON for `SwingSettings`.
    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),
}

impl SwingError {
    /// Creates a degenerate chain error at the given point.
    #[must_use]
    pub fn degenerate(at: glam::Vec3) -> Self {
        Self::DegenerateChain {
            x: at.x,
            y: at.y,
            z: at.z,
        }
    }

    /// Creates an invalid settings error.
    #[must_use]
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SwingError>;
