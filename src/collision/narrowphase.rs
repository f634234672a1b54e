use glam::{Mat3, Vec3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    config::DEFAULT_SPECULATIVE_MARGIN,
    core::{collider::ColliderShape, constraints::BodySet, rigidbody::RigidBody},
    utils::allocator::BodyHandle,
};

/// One point of contact geometry as handed to the arbiters.
///
/// `point1` lies on body 1's surface, `point2` on body 2's, `normal` points
/// from body 1 toward body 2 and `penetration` is positive when overlapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactReport {
    pub body1: BodyHandle,
    pub body2: BodyHandle,
    pub point1: Vec3,
    pub point2: Vec3,
    pub normal: Vec3,
    pub penetration: f32,
}

/// Source of contact geometry for a world step.
pub trait CollisionDetector: Send + Sync {
    fn detect(&self, bodies: &BodySet) -> Vec<ContactReport>;
}

/// Brute-force pair test with analytic contact generation.
///
/// Supports sphere-sphere, sphere-box and anything against a half-space.
/// Box-box pairs produce no contacts.
#[derive(Debug, Clone)]
pub struct NarrowPhase {
    speculative_margin: f32,
    parallel: bool,
}

impl Default for NarrowPhase {
    fn default() -> Self {
        Self {
            speculative_margin: DEFAULT_SPECULATIVE_MARGIN,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl NarrowPhase {
    pub fn new(speculative_margin: f32) -> Self {
        Self {
            speculative_margin: speculative_margin.max(0.0),
            ..Self::default()
        }
    }

    pub fn speculative_margin(&self) -> f32 {
        self.speculative_margin
    }

    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled && cfg!(feature = "parallel");
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Candidate pairs whose margin-expanded bounds overlap.
    pub fn candidate_pairs<'a>(&self, bodies: &'a BodySet) -> Vec<(&'a RigidBody, &'a RigidBody)> {
        let all: Vec<&RigidBody> = bodies.values().collect();
        let mut pairs = Vec::new();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                if !a.is_dynamic() && !b.is_dynamic() {
                    continue;
                }
                let mut bounds_a = a.bounding_box();
                bounds_a.expand(self.speculative_margin);
                if bounds_a.intersects(&b.bounding_box()) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }

    /// Contacts between two bodies, with the pair reordered so that
    /// half-spaces come first and boxes before spheres.
    pub fn collide(&self, a: &RigidBody, b: &RigidBody) -> Vec<ContactReport> {
        let (body1, body2) = if shape_rank(b.shape()) < shape_rank(a.shape()) {
            (b, a)
        } else {
            (a, b)
        };

        let mut out = Vec::new();
        match (*body1.shape(), *body2.shape()) {
            (ColliderShape::Sphere { radius: r1 }, ColliderShape::Sphere { radius: r2 }) => {
                self.sphere_sphere(body1, r1, body2, r2, &mut out)
            }
            (ColliderShape::HalfSpace { normal }, ColliderShape::Sphere { radius }) => {
                self.half_space_sphere(body1, normal, body2, radius, &mut out)
            }
            (ColliderShape::HalfSpace { normal }, ColliderShape::Box { half_extents }) => {
                self.half_space_box(body1, normal, body2, half_extents, &mut out)
            }
            (ColliderShape::Box { half_extents }, ColliderShape::Sphere { radius }) => {
                self.box_sphere(body1, half_extents, body2, radius, &mut out)
            }
            _ => {}
        }
        out
    }

    fn report(&self, out: &mut Vec<ContactReport>, report: ContactReport) {
        if report.penetration > -self.speculative_margin {
            out.push(report);
        }
    }

    fn sphere_sphere(
        &self,
        body1: &RigidBody,
        r1: f32,
        body2: &RigidBody,
        r2: f32,
        out: &mut Vec<ContactReport>,
    ) {
        let delta = body2.position() - body1.position();
        let distance = delta.length();
        let normal = if distance > 1e-6 { delta / distance } else { Vec3::Y };
        self.report(
            out,
            ContactReport {
                body1: body1.handle(),
                body2: body2.handle(),
                point1: body1.position() + normal * r1,
                point2: body2.position() - normal * r2,
                normal,
                penetration: r1 + r2 - distance,
            },
        );
    }

    fn half_space_sphere(
        &self,
        plane: &RigidBody,
        local_normal: Vec3,
        sphere: &RigidBody,
        radius: f32,
        out: &mut Vec<ContactReport>,
    ) {
        let normal = plane.orientation() * local_normal;
        let deepest = sphere.position() - normal * radius;
        let gap = normal.dot(deepest - plane.position());
        self.report(
            out,
            ContactReport {
                body1: plane.handle(),
                body2: sphere.handle(),
                point1: deepest - normal * gap,
                point2: deepest,
                normal,
                penetration: -gap,
            },
        );
    }

    fn half_space_box(
        &self,
        plane: &RigidBody,
        local_normal: Vec3,
        cuboid: &RigidBody,
        half_extents: Vec3,
        out: &mut Vec<ContactReport>,
    ) {
        let normal = plane.orientation() * local_normal;
        for corner in ColliderShape::box_corners(half_extents) {
            let world = cuboid.to_world(corner);
            let gap = normal.dot(world - plane.position());
            self.report(
                out,
                ContactReport {
                    body1: plane.handle(),
                    body2: cuboid.handle(),
                    point1: world - normal * gap,
                    point2: world,
                    normal,
                    penetration: -gap,
                },
            );
        }
    }

    fn box_sphere(
        &self,
        cuboid: &RigidBody,
        half_extents: Vec3,
        sphere: &RigidBody,
        radius: f32,
        out: &mut Vec<ContactReport>,
    ) {
        let rotation: Mat3 = cuboid.orientation();
        let local = cuboid.to_local(sphere.position());
        let clamped = local.clamp(-half_extents, half_extents);

        let (surface, local_normal, separation) = if local == clamped {
            // Centre inside the box: push out through the nearest face.
            let depth = half_extents - local.abs();
            let axis = if depth.x <= depth.y && depth.x <= depth.z {
                0
            } else if depth.y <= depth.z {
                1
            } else {
                2
            };
            let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
            let mut surface = local;
            surface[axis] = sign * half_extents[axis];
            let mut normal = Vec3::ZERO;
            normal[axis] = sign;
            (surface, normal, -depth[axis])
        } else {
            let offset = local - clamped;
            let distance = offset.length();
            (clamped, offset / distance, distance)
        };

        let normal = rotation * local_normal;
        self.report(
            out,
            ContactReport {
                body1: cuboid.handle(),
                body2: sphere.handle(),
                point1: cuboid.to_world(surface),
                point2: sphere.position() - normal * radius,
                normal,
                penetration: radius - separation,
            },
        );
    }
}

impl CollisionDetector for NarrowPhase {
    fn detect(&self, bodies: &BodySet) -> Vec<ContactReport> {
        let pairs = self.candidate_pairs(bodies);

        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                return pairs
                    .par_iter()
                    .flat_map_iter(|(a, b)| self.collide(a, b))
                    .collect();
            }
        }

        pairs
            .iter()
            .flat_map(|(a, b)| self.collide(a, b))
            .collect()
    }
}

fn shape_rank(shape: &ColliderShape) -> u8 {
    match shape {
        ColliderShape::HalfSpace { .. } => 0,
        ColliderShape::Box { .. } => 1,
        ColliderShape::Sphere { .. } => 2,
    }
}
