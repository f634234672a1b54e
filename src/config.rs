//! Global configuration constants and per-world contact tuning.

use serde::{Deserialize, Serialize};

use crate::core::types::MixingMode;

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Number of velocity iterations performed per step.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Default damping applied to linear velocity.
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.0;

/// Default damping applied to angular velocity.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.0;

/// Upper bound on the Baumgarte bias velocity.
pub const DEFAULT_MAXIMUM_BIAS: f32 = 10.0;

/// Fraction of penetration beyond the slop fed back per second.
pub const DEFAULT_BIAS_FACTOR: f32 = 0.25;

/// Relative velocity below which a contact skips its iteration.
pub const DEFAULT_MINIMUM_VELOCITY: f32 = 0.001;

/// Penetration slop tolerated without correction.
pub const DEFAULT_ALLOWED_PENETRATION: f32 = 0.01;

/// Distance under which a reported point refreshes an existing one.
pub const DEFAULT_BREAK_THRESHOLD: f32 = 0.01;

/// Closing speed that must be exceeded before restitution kicks in.
pub const DEFAULT_RESTITUTION_VELOCITY_THRESHOLD: f32 = 1.0;

/// Distance at which the reference narrow phase starts reporting speculative points.
pub const DEFAULT_SPECULATIVE_MARGIN: f32 = 0.05;

/// Maximum number of fixed steps `advance` runs before dropping time.
pub const DEFAULT_MAX_STEPS: usize = 8;

/// Tuning shared by every contact of a world.
///
/// Passed explicitly into contacts and arbiters so several worlds can run with
/// different settings side by side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactSettings {
    pub maximum_bias: f32,
    pub bias_factor: f32,
    pub minimum_velocity: f32,
    pub allowed_penetration: f32,
    pub break_threshold: f32,
    pub restitution_velocity_threshold: f32,
    pub material_mixing: MixingMode,
}

impl Default for ContactSettings {
    fn default() -> Self {
        Self {
            maximum_bias: DEFAULT_MAXIMUM_BIAS,
            bias_factor: DEFAULT_BIAS_FACTOR,
            minimum_velocity: DEFAULT_MINIMUM_VELOCITY,
            allowed_penetration: DEFAULT_ALLOWED_PENETRATION,
            break_threshold: DEFAULT_BREAK_THRESHOLD,
            restitution_velocity_threshold: DEFAULT_RESTITUTION_VELOCITY_THRESHOLD,
            material_mixing: MixingMode::Average,
        }
    }
}

impl ContactSettings {
    pub fn with_mixing(mut self, mode: MixingMode) -> Self {
        self.material_mixing = mode;
        self
    }

    pub fn with_allowed_penetration(mut self, slop: f32) -> Self {
        self.allowed_penetration = slop;
        self
    }

    pub fn with_break_threshold(mut self, threshold: f32) -> Self {
        self.break_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_from_defaults() {
        let settings: ContactSettings =
            serde_json::from_str(r#"{ "bias_factor": 0.5, "material_mixing": "Max" }"#).unwrap();
        assert!((settings.bias_factor - 0.5).abs() < 1e-6);
        assert_eq!(settings.material_mixing, MixingMode::Max);
        assert!((settings.maximum_bias - DEFAULT_MAXIMUM_BIAS).abs() < 1e-6);
        assert!((settings.break_threshold - DEFAULT_BREAK_THRESHOLD).abs() < 1e-6);
    }
}
