//! Contact Dynamics – persistent-contact rigid body solver for Rust.
//!
//! Bodies, per-pair arbiters with four-point manifolds, warm-started
//! sequential impulses with Coulomb friction, restitution and speculative
//! contacts, plus thin reference collaborators (narrow phase, integrator,
//! world loop) that drive them.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Quat, Vec3};

pub use collision::{
    arbiter::{Arbiter, ContactList},
    arbiter_map::{ArbiterKey, ArbiterMap},
    narrowphase::{CollisionDetector, ContactReport, NarrowPhase},
};
pub use config::ContactSettings;
pub use core::{
    collider::{Aabb, ColliderShape},
    constraints::{BodySet, Constraint},
    rigidbody::RigidBody,
    types::{MassProperties, Material, MaterialPairProperties, MixingMode},
};
pub use dynamics::{
    contact::Contact,
    integrator::Integrator,
    joints::{FixedAngle, PointOnLine},
    solver::{ContactSolver, SolverStepMetrics},
};
pub use error::{DynamicsError, Result};
pub use utils::allocator::{Arena, BodyHandle, GenerationalId};
pub use world::PhysicsWorld;

/// Fixed-step wrapper around a [`PhysicsWorld`] for frame-driven callers.
pub struct PhysicsEngine {
    world: PhysicsWorld,
    max_steps: usize,
}

impl PhysicsEngine {
    /// Creates an engine stepping at `time_step` seconds.
    pub fn new(time_step: f32, settings: ContactSettings) -> Result<Self> {
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(DynamicsError::InvalidTimestep(time_step));
        }
        let mut world = PhysicsWorld::new(settings);
        world.time_step = time_step;
        Ok(Self {
            world,
            max_steps: config::DEFAULT_MAX_STEPS,
        })
    }

    /// Caps how many fixed steps one frame may run.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.world.add_body(body)
    }

    /// Feeds one frame's elapsed time and returns the number of steps taken.
    pub fn update(&mut self, elapsed: f32) -> Result<usize> {
        self.world.advance(elapsed, self.max_steps)
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }
}
