//! Swing tuning and rope quality settings
//!
//! Supplied once when a controller is built. Persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwingError};

/// Rope simulation quality levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RopeQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl RopeQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            RopeQuality::Low => "Low",
            RopeQuality::Medium => "Medium",
            RopeQuality::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(RopeQuality::Low),
            "medium" | "med" => Some(RopeQuality::Medium),
            "high" => Some(RopeQuality::High),
            _ => None,
        }
    }

    /// Points per simulated rope
    pub fn resolution(&self) -> usize {
        match self {
            RopeQuality::Low => 16,
            RopeQuality::Medium => 32,
            RopeQuality::High => 50,
        }
    }

    /// Distance-constraint relaxation passes per step
    pub fn constraint_iterations(&self) -> usize {
        match self {
            RopeQuality::Low => 15,
            RopeQuality::Medium => 30,
            RopeQuality::High => 50,
        }
    }
}

/// Swing tunables
///
/// Angles are in degrees, distances in metres, times in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingSettings {
    /// Rope quality preset the resolution/iteration fields were derived from
    pub quality: RopeQuality,

    // === Rope ===
    /// Maximum rope length
    pub rope_length: f32,
    /// Points in the hook rope
    pub rope_resolution: usize,
    /// Points in the hold rope (body to hand)
    pub hold_rope_resolution: usize,
    /// Constraint relaxation passes per rope step
    pub constraint_iterations: usize,
    /// Per-step velocity loss of rope points (0-1)
    pub rope_dampening: f32,
    /// Blend toward neighbour midpoint per step (0-1)
    pub smoothing_factor: f32,
    /// Radius of the collision sphere around each rope point
    pub rope_collider_radius: f32,
    /// Rendered rope thickness
    pub rope_radius: f32,
    /// Extra length given to the hold rope
    pub hold_rope_slack: f32,
    /// Correction scale for the hold rope constraints
    pub hold_rope_stiffness: f32,

    // === Throw ===
    /// Peak height of the throw parabola above the straight path
    pub throw_height: f32,
    /// Flight time of the hook
    pub throw_duration: f32,
    /// Delay between the throw animation starting and the hook leaving the hand
    pub throw_windup: f32,
    /// Minimum anchor distance
    pub min_distance: f32,
    /// Reach is `rope_length - reach_margin`
    pub reach_margin: f32,
    /// Aim indicator pull-back toward the viewer
    pub crosshair_size: f32,
    /// Turn rate toward the anchor; times 50 gives degrees per second
    pub rotate_speed: f32,

    // === Swing ===
    /// Steering acceleration, also the initial swing speed
    pub swing_force: f32,
    /// Turn rate toward the view direction while swinging (degrees/s)
    pub swing_rotation_speed: f32,
    /// Rope climb rate (m/s at full input)
    pub climb_speed: f32,
    /// Forward momentum multiplier on release
    pub forward_land_force_multiplier: f32,
    /// Upward momentum multiplier on release
    pub upward_land_force_multiplier: f32,
    /// Extra velocity damping rate while swinging
    pub damping: f32,
    /// Vertical gravity while swinging (negative is down)
    pub gravity: f32,
    /// Speed kept after hitting an obstacle (0-1)
    pub collision_friction: f32,
    /// Steering stops adding energy past this angle from vertical
    pub max_swing_angle_deg: f32,
    /// Climbing may start below this angle from vertical
    pub climb_angle_threshold_deg: f32,
    /// Horizontal speed below which steering is always allowed
    pub steer_speed_threshold: f32,
    /// How far the rope must lengthen past the last grounded length before swinging
    pub grounded_swing_margin: f32,
    /// Extra length added to the measured rope length when the swing starts
    pub swing_length_slack: f32,
    /// Required room above `min_distance` to start climbing up
    pub climb_up_headroom: f32,
    /// Required room below `rope_length` to start climbing down
    pub climb_down_headroom: f32,

    // === Timing ===
    /// Throws stay disabled this long after a retract
    pub retract_cooldown: f32,
    /// Landing animation window before returning to idle
    pub landing_window: f32,
    /// Animation crossfade duration
    pub crossfade_time: f32,
}

impl Default for SwingSettings {
    fn default() -> Self {
        let quality = RopeQuality::default();
        Self {
            quality,

            // Rope
            rope_length: 10.0,
            rope_resolution: quality.resolution(),
            hold_rope_resolution: quality.resolution(),
            constraint_iterations: quality.constraint_iterations(),
            rope_dampening: 0.5,
            smoothing_factor: 0.1,
            rope_collider_radius: 0.05,
            rope_radius: 0.025,
            hold_rope_slack: 0.1,
            hold_rope_stiffness: 0.9,

            // Throw
            throw_height: 1.0,
            throw_duration: 0.5,
            throw_windup: 0.3,
            min_distance: 2.0,
            reach_margin: 1.0,
            crosshair_size: 0.3,
            rotate_speed: 15.0,

            // Swing
            swing_force: 4.0,
            swing_rotation_speed: 100.0,
            climb_speed: 3.0,
            forward_land_force_multiplier: 1.0,
            upward_land_force_multiplier: 2.0,
            damping: 0.5,
            gravity: -20.0,
            collision_friction: 0.2,
            max_swing_angle_deg: 60.0,
            climb_angle_threshold_deg: 15.0,
            steer_speed_threshold: 0.1,
            grounded_swing_margin: 0.5,
            swing_length_slack: 0.5,
            climb_up_headroom: 1.5,
            climb_down_headroom: 0.5,

            // Timing
            retract_cooldown: 0.5,
            landing_window: 0.2,
            crossfade_time: 0.2,
        }
    }
}

impl SwingSettings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: RopeQuality) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates rope resolution and solver passes)
    pub fn apply_preset(&mut self, preset: RopeQuality) {
        self.quality = preset;
        self.rope_resolution = preset.resolution();
        self.hold_rope_resolution = preset.resolution();
        self.constraint_iterations = preset.constraint_iterations();
    }

    /// Longest anchor distance the aim scan accepts
    pub fn max_reach(&self) -> f32 {
        self.rope_length - self.reach_margin
    }

    /// Gravity as a vector
    pub fn gravity_vector(&self) -> glam::Vec3 {
        glam::Vec3::new(0.0, self.gravity, 0.0)
    }

    /// Check tunables for values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rope_resolution < 2 {
            return Err(SwingError::InvalidResolution(self.rope_resolution));
        }
        if self.hold_rope_resolution < 2 {
            return Err(SwingError::InvalidResolution(self.hold_rope_resolution));
        }
        if !(self.min_distance > 0.0) {
            return Err(SwingError::settings("min_distance must be positive"));
        }
        if self.min_distance >= self.max_reach() {
            return Err(SwingError::settings(format!(
                "min_distance {} leaves no reach below rope_length {} - reach_margin {}",
                self.min_distance, self.rope_length, self.reach_margin
            )));
        }
        if !(self.throw_duration > 0.0) {
            return Err(SwingError::settings("throw_duration must be positive"));
        }
        if !(0.0..=1.0).contains(&self.rope_dampening) {
            return Err(SwingError::settings("rope_dampening must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(SwingError::settings("smoothing_factor must be within 0..=1"));
        }
        if !(self.max_swing_angle_deg > 0.0 && self.max_swing_angle_deg < 180.0) {
            return Err(SwingError::settings("max_swing_angle_deg must be within (0, 180)"));
        }
        Ok(())
    }

    /// Parse settings from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded swing settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Swing settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = SwingSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rope_resolution, 50);
        assert!((settings.max_reach() - 9.0).abs() < 0.0001);
    }

    #[test]
    fn test_preset_applies_resolution() {
        let settings = SwingSettings::from_preset(RopeQuality::Low);
        assert_eq!(settings.quality, RopeQuality::Low);
        assert_eq!(settings.rope_resolution, 16);
        assert_eq!(settings.constraint_iterations, 15);
        assert_eq!(RopeQuality::from_str("MED"), Some(RopeQuality::Medium));
        assert_eq!(RopeQuality::from_str("ultra"), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = SwingSettings::default();
        settings.rope_resolution = 1;
        assert!(matches!(
            settings.validate(),
            Err(SwingError::InvalidResolution(1))
        ));

        let mut settings = SwingSettings::default();
        settings.min_distance = 9.5;
        assert!(matches!(
            settings.validate(),
            Err(SwingError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_json_partial_fills_defaults() {
        let settings = SwingSettings::from_json(r#"{ "rope_length": 14.0, "quality": "Medium" }"#)
            .expect("valid json");
        assert_eq!(settings.rope_length, 14.0);
        assert_eq!(settings.quality, RopeQuality::Medium);
        assert_eq!(settings.swing_force, 4.0);

        let round = SwingSettings::from_json(&settings.to_json().expect("serialize"))
            .expect("reparse");
        assert_eq!(round.rope_length, 14.0);
    }

    #[test]
    fn test_json_rejects_garbage() {
        assert!(matches!(
            SwingSettings::from_json("{ not json"),
            Err(SwingError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("rope_swing_settings_{}.json", std::process::id()));
        let mut settings = SwingSettings::default();
        settings.climb_speed = 5.5;
        settings.save(&path).expect("save");
        let loaded = SwingSettings::load(&path).expect("load");
        assert_eq!(loaded.climb_speed, 5.5);
        let _ = std::fs::remove_file(&path);
    }
}
