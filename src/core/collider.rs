use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::types::{InertiaTensorExt, MassProperties};

/// Extent used for unbounded shapes so overlap math stays finite.
const UNBOUNDED_EXTENT: f32 = 1.0e6;

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_center_extent(center: Vec3, extent: Vec3) -> Self {
        Self::new(center - extent, center + extent)
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grows the box along `displacement` so it covers the whole sweep.
    pub fn sweep(&mut self, displacement: Vec3) {
        self.min += displacement.min(Vec3::ZERO);
        self.max += displacement.max(Vec3::ZERO);
    }

    pub fn expand(&mut self, margin: f32) {
        self.min -= Vec3::splat(margin);
        self.max += Vec3::splat(margin);
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && point.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Geometry attached to a rigid body, expressed in body space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: Vec3,
    },
    /// Everything below the plane through the body origin with the given
    /// body-space outward normal.
    HalfSpace {
        normal: Vec3,
    },
}

impl ColliderShape {
    pub fn sphere(radius: f32) -> Self {
        ColliderShape::Sphere { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        ColliderShape::Box { half_extents }
    }

    pub fn half_space(normal: Vec3) -> Self {
        ColliderShape::HalfSpace {
            normal: normal.normalize_or(Vec3::Y),
        }
    }

    pub fn is_bounded(&self) -> bool {
        !matches!(self, ColliderShape::HalfSpace { .. })
    }

    pub fn volume(&self) -> f32 {
        match self {
            ColliderShape::Sphere { radius } => {
                4.0 / 3.0 * std::f32::consts::PI * radius * radius * radius
            }
            ColliderShape::Box { half_extents } => {
                8.0 * half_extents.x * half_extents.y * half_extents.z
            }
            ColliderShape::HalfSpace { .. } => f32::INFINITY,
        }
    }

    /// Mass properties at the given density. Unbounded shapes report unit mass
    /// and identity inertia; such bodies are expected to be static.
    pub fn mass_properties(&self, density: f32) -> MassProperties {
        match self {
            ColliderShape::Sphere { radius } => {
                let mass = self.volume() * density;
                MassProperties {
                    mass,
                    inertia: Mat3::for_solid_sphere(*radius, mass),
                }
            }
            ColliderShape::Box { half_extents } => {
                let mass = self.volume() * density;
                MassProperties {
                    mass,
                    inertia: Mat3::for_solid_box(*half_extents, mass),
                }
            }
            ColliderShape::HalfSpace { .. } => MassProperties::default(),
        }
    }

    /// World-space bounds for the shape at the given pose.
    pub fn bounding_box(&self, position: Vec3, orientation: &Mat3) -> Aabb {
        match self {
            ColliderShape::Sphere { radius } => {
                Aabb::from_center_extent(position, Vec3::splat(*radius))
            }
            ColliderShape::Box { half_extents } => {
                let abs = Mat3::from_cols(
                    orientation.x_axis.abs(),
                    orientation.y_axis.abs(),
                    orientation.z_axis.abs(),
                );
                Aabb::from_center_extent(position, abs * *half_extents)
            }
            ColliderShape::HalfSpace { .. } => {
                Aabb::from_center_extent(Vec3::ZERO, Vec3::splat(UNBOUNDED_EXTENT))
            }
        }
    }

    /// Corner points of a box in body space.
    pub fn box_corners(half_extents: Vec3) -> [Vec3; 8] {
        let h = half_extents;
        [
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
        ]
    }
}
