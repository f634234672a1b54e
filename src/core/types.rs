use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// Mass and body-space inertia tensor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f32,
    pub inertia: Mat3,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1.0,
            inertia: Mat3::IDENTITY,
        }
    }
}

/// Surface coefficients that affect contact response.
///
/// Values are conventionally in `[0, 1]` but are not validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub static_friction: f32,
    pub kinetic_friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            static_friction: 0.6,
            kinetic_friction: 0.3,
            restitution: 0.0,
        }
    }
}

impl Material {
    pub fn new(static_friction: f32, kinetic_friction: f32, restitution: f32) -> Self {
        Self {
            static_friction,
            kinetic_friction,
            restitution,
        }
    }

    /// Frictionless surface.
    pub fn frictionless(restitution: f32) -> Self {
        Self::new(0.0, 0.0, restitution)
    }

    pub fn rubber() -> Self {
        Self::new(1.2, 1.0, 0.8)
    }

    pub fn steel() -> Self {
        Self::new(0.58, 0.44, 0.4)
    }

    pub fn ice() -> Self {
        Self::new(0.05, 0.03, 0.05)
    }

    /// Mixes two materials scalar by scalar.
    pub fn combine_with(&self, other: &Self, mode: MixingMode) -> MaterialPairProperties {
        MaterialPairProperties {
            static_friction: mode.combine(self.static_friction, other.static_friction),
            kinetic_friction: mode.combine(self.kinetic_friction, other.kinetic_friction),
            restitution: mode.combine(self.restitution, other.restitution),
        }
    }
}

/// Global policy for combining the coefficients of two touching materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MixingMode {
    #[default]
    Average,
    Min,
    Max,
}

impl MixingMode {
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            MixingMode::Average => 0.5 * (a + b),
            MixingMode::Min => a.min(b),
            MixingMode::Max => a.max(b),
        }
    }
}

/// Effective coefficients for one contact, mixed once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialPairProperties {
    pub static_friction: f32,
    pub kinetic_friction: f32,
    pub restitution: f32,
}

impl MaterialPairProperties {
    pub fn from_materials(a: &Material, b: &Material, mode: MixingMode) -> Self {
        a.combine_with(b, mode)
    }
}

/// Helper methods for inertia calculations.
pub trait InertiaTensorExt {
    fn for_solid_box(half_extents: Vec3, mass: f32) -> Mat3;
    fn for_solid_sphere(radius: f32, mass: f32) -> Mat3;
}

impl InertiaTensorExt for Mat3 {
    fn for_solid_box(half_extents: Vec3, mass: f32) -> Mat3 {
        let lx = half_extents.x * 2.0;
        let ly = half_extents.y * 2.0;
        let lz = half_extents.z * 2.0;
        let factor = mass / 12.0;
        Mat3::from_diagonal(Vec3::new(
            factor * (ly * ly + lz * lz),
            factor * (lx * lx + lz * lz),
            factor * (lx * lx + ly * ly),
        ))
    }

    fn for_solid_sphere(radius: f32, mass: f32) -> Mat3 {
        let value = 0.4 * mass * radius * radius;
        Mat3::from_diagonal(Vec3::splat(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixing_modes_combine_expected_values() {
        let mode = MixingMode::Average;
        assert!((mode.combine(0.6, 0.2) - 0.4).abs() < 1e-5);

        let mode = MixingMode::Min;
        assert!((mode.combine(0.6, 0.2) - 0.2).abs() < 1e-5);

        let mode = MixingMode::Max;
        assert!((mode.combine(0.6, 0.2) - 0.6).abs() < 1e-5);
    }

    #[test]
    fn pair_properties_mix_each_scalar_independently() {
        let a = Material::new(0.9, 0.1, 0.0);
        let b = Material::new(0.3, 0.5, 1.0);

        let max = a.combine_with(&b, MixingMode::Max);
        assert_eq!(max, MaterialPairProperties {
            static_friction: 0.9,
            kinetic_friction: 0.5,
            restitution: 1.0,
        });

        let min = MaterialPairProperties::from_materials(&a, &b, MixingMode::Min);
        assert!((min.static_friction - 0.3).abs() < 1e-6);
        assert!((min.kinetic_friction - 0.1).abs() < 1e-6);
        assert!(min.restitution.abs() < 1e-6);
    }

    #[test]
    fn negative_coefficients_pass_through_unchecked() {
        let a = Material::new(-1.0, 0.0, 2.0);
        let pair = a.combine_with(&a, MixingMode::Average);
        assert!((pair.static_friction + 1.0).abs() < 1e-6);
        assert!((pair.restitution - 2.0).abs() < 1e-6);
    }

    #[test]
    fn box_inertia_matches_closed_form() {
        let inertia = Mat3::for_solid_box(Vec3::splat(0.5), 1.0);
        assert!((inertia.x_axis.x - 1.0 / 6.0).abs() < 1e-6);
        assert!((inertia.y_axis.y - 1.0 / 6.0).abs() < 1e-6);
        assert!((inertia.z_axis.z - 1.0 / 6.0).abs() < 1e-6);
    }
}
