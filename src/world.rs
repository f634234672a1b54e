use std::time::Instant;

use glam::Vec3;
use log::{debug, warn};

use crate::{
    collision::{
        arbiter_map::ArbiterMap,
        narrowphase::{CollisionDetector, NarrowPhase},
    },
    config::{ContactSettings, DEFAULT_GRAVITY, DEFAULT_TIME_STEP},
    core::{
        constraints::{BodySet, Constraint},
        rigidbody::RigidBody,
    },
    dynamics::{
        integrator::Integrator,
        solver::{ContactSolver, SolverStepMetrics},
    },
    error::{DynamicsError, Result},
    utils::{
        allocator::BodyHandle,
        logging::{ScopedTimer, warn_if_step_over_budget},
    },
};

/// Owns bodies, arbiters and joints and steps them in a fixed phase order:
/// refresh cached contacts, detect, integrate forces, solve, integrate.
pub struct PhysicsWorld {
    bodies: BodySet,
    arbiters: ArbiterMap,
    constraints: Vec<Box<dyn Constraint>>,
    pub settings: ContactSettings,
    pub gravity: Vec3,
    pub time_step: f32,
    /// Optional per-step budget in milliseconds; overruns are logged.
    pub step_budget_ms: Option<f32>,
    solver: ContactSolver,
    integrator: Integrator,
    detector: Box<dyn CollisionDetector>,
    time_accumulated: f32,
    last_metrics: SolverStepMetrics,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(ContactSettings::default())
    }
}

impl PhysicsWorld {
    pub fn new(settings: ContactSettings) -> Self {
        Self {
            bodies: BodySet::new(),
            arbiters: ArbiterMap::new(),
            constraints: Vec::new(),
            settings,
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            time_step: DEFAULT_TIME_STEP,
            step_budget_ms: None,
            solver: ContactSolver::default(),
            integrator: Integrator::new(),
            detector: Box::new(NarrowPhase::default()),
            time_accumulated: 0.0,
            last_metrics: SolverStepMetrics::default(),
        }
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn set_iterations(&mut self, iterations: u32) -> Result<()> {
        self.solver.set_iterations(iterations)
    }

    pub fn solver(&self) -> &ContactSolver {
        &self.solver
    }

    pub fn integrator_mut(&mut self) -> &mut Integrator {
        &mut self.integrator
    }

    /// Replaces the collision source. Cached arbiters are kept.
    pub fn set_detector<D>(&mut self, detector: D)
    where
        D: CollisionDetector + 'static,
    {
        self.detector = Box::new(detector);
    }

    pub fn add_body(&mut self, mut body: RigidBody) -> BodyHandle {
        self.bodies.insert_with(|handle| {
            body.handle = handle;
            body.update();
            body
        })
    }

    /// Removes a body together with every arbiter and joint that references it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let body = self
            .bodies
            .remove(handle)
            .ok_or(DynamicsError::UnknownBody(handle))?;
        let arbiters = self.arbiters.remove_body(handle);
        let before = self.constraints.len();
        self.constraints.retain(|constraint| {
            let (a, b) = constraint.bodies();
            a != handle && b != handle
        });
        debug!(
            "removed {handle} with {arbiters} arbiters and {} constraints",
            before - self.constraints.len()
        );
        Ok(body)
    }

    pub fn add_constraint<C>(&mut self, constraint: C) -> Result<()>
    where
        C: Constraint + 'static,
    {
        let (a, b) = constraint.bodies();
        for handle in [a, b] {
            if !self.bodies.contains(handle) {
                return Err(DynamicsError::UnknownBody(handle));
            }
        }
        self.constraints.push(Box::new(constraint));
        Ok(())
    }

    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    pub fn arbiters(&self) -> &ArbiterMap {
        &self.arbiters
    }

    pub fn arbiters_mut(&mut self) -> &mut ArbiterMap {
        &mut self.arbiters
    }

    pub fn last_metrics(&self) -> &SolverStepMetrics {
        &self.last_metrics
    }

    /// Folds one externally detected contact into the pair's arbiter.
    ///
    /// The normal points from `body1` to `body2`; if the arbiter stores the
    /// pair the other way round the geometry is flipped to match.
    #[allow(clippy::too_many_arguments)]
    pub fn collision_detected(
        &mut self,
        body1: BodyHandle,
        body2: BodyHandle,
        point1: Vec3,
        point2: Vec3,
        normal: Vec3,
        penetration: f32,
    ) -> Result<()> {
        let first = self.bodies.get(body1).ok_or(DynamicsError::UnknownBody(body1))?;
        let second = self.bodies.get(body2).ok_or(DynamicsError::UnknownBody(body2))?;
        if body1 == body2 {
            return Ok(());
        }

        let (arbiter, created) = self.arbiters.get_or_create(body1, body2);
        if created {
            debug!("begin collide {body1}-{body2}");
        }
        arbiter.add_contact(first, second, point1, point2, normal, penetration, &self.settings);
        Ok(())
    }

    /// Runs one simulation step of length `dt`.
    pub fn step(&mut self, dt: f32) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(DynamicsError::InvalidTimestep(dt));
        }
        let started = Instant::now();

        {
            let _timer = ScopedTimer::new("contacts::update");
            for arbiter in self.arbiters.iter_mut() {
                arbiter.update_contacts(&self.bodies, &self.settings);
            }
            for (a, b) in self.arbiters.collect_garbage() {
                debug!("end collide {a}-{b}");
            }
        }

        {
            let _timer = ScopedTimer::new("collision::detect");
            let reports = self.detector.detect(&self.bodies);
            for report in reports {
                self.collision_detected(
                    report.body1,
                    report.body2,
                    report.point1,
                    report.point2,
                    report.normal,
                    report.penetration,
                )?;
            }
        }

        {
            let _timer = ScopedTimer::new("integrate::forces");
            self.integrator.integrate_forces(&mut self.bodies, self.gravity, dt);
        }

        {
            let _timer = ScopedTimer::new("solver::contacts");
            self.last_metrics =
                self.solver
                    .solve(&mut self.bodies, &mut self.arbiters, &mut self.constraints, dt);
        }

        {
            let _timer = ScopedTimer::new("integrate::bodies");
            self.integrator.integrate(&mut self.bodies, dt);
        }

        if let Some(budget) = self.step_budget_ms {
            warn_if_step_over_budget(started.elapsed(), budget);
        }
        Ok(())
    }

    /// Accumulates `elapsed` and runs as many fixed `time_step` steps as fit,
    /// at most `max_steps`. Time beyond that is dropped. Returns the steps run.
    pub fn advance(&mut self, elapsed: f32, max_steps: usize) -> Result<usize> {
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(DynamicsError::InvalidTimestep(elapsed));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(DynamicsError::InvalidTimestep(self.time_step));
        }

        self.time_accumulated += elapsed;
        let mut steps = 0;
        while self.time_accumulated >= self.time_step && steps < max_steps {
            self.step(self.time_step)?;
            self.time_accumulated -= self.time_step;
            steps += 1;
        }

        if self.time_accumulated >= self.time_step {
            warn!(
                "dropping {:.4} s of simulation time after {steps} steps",
                self.time_accumulated
            );
            self.time_accumulated = 0.0;
        }
        Ok(steps)
    }
}
