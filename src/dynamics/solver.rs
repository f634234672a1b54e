use crate::{
    collision::{arbiter::ContactList, arbiter_map::ArbiterMap},
    config::DEFAULT_SOLVER_ITERATIONS,
    core::constraints::{BodySet, Constraint},
    error::{DynamicsError, Result},
};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SolverStepMetrics {
    pub arbiters_solved: usize,
    pub contacts_solved: usize,
    pub constraints_solved: usize,
    pub constraints_skipped: usize,
    pub normal_impulse_sum: f32,
    pub tangent_impulse_sum: f32,
}

impl SolverStepMetrics {
    pub fn record_arbiter(&mut self, contacts: &ContactList) {
        self.arbiters_solved += 1;
        self.contacts_solved += contacts.len();
        for contact in contacts.iter() {
            self.normal_impulse_sum += contact.accumulated_normal_impulse().abs();
            self.tangent_impulse_sum += contact.accumulated_tangent_impulse().abs();
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.arbiters_solved += other.arbiters_solved;
        self.contacts_solved += other.contacts_solved;
        self.constraints_solved += other.constraints_solved;
        self.constraints_skipped += other.constraints_skipped;
        self.normal_impulse_sum += other.normal_impulse_sum;
        self.tangent_impulse_sum += other.tangent_impulse_sum;
    }
}

/// Sequential-impulse solver over contacts and joints.
///
/// Every constraint is prepared before the first velocity pass; each pass then
/// visits all contacts followed by all joints, reading the velocities the
/// previous constraint just wrote.
#[derive(Debug, Clone)]
pub struct ContactSolver {
    iterations: u32,
}

impl Default for ContactSolver {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_SOLVER_ITERATIONS,
        }
    }
}

impl ContactSolver {
    pub fn new(iterations: u32) -> Result<Self> {
        if iterations == 0 {
            return Err(DynamicsError::InvalidIterations);
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: u32) -> Result<()> {
        if iterations == 0 {
            return Err(DynamicsError::InvalidIterations);
        }
        self.iterations = iterations;
        Ok(())
    }

    pub fn solve(
        &self,
        bodies: &mut BodySet,
        arbiters: &mut ArbiterMap,
        constraints: &mut [Box<dyn Constraint>],
        dt: f32,
    ) -> SolverStepMetrics {
        let mut metrics = SolverStepMetrics::default();

        let awake: Vec<bool> = constraints
            .iter()
            .map(|constraint| {
                let (a, b) = constraint.bodies();
                let active = |handle| bodies.get(handle).is_some_and(|body| body.is_active());
                active(a) || active(b)
            })
            .collect();

        for arbiter in arbiters.iter_mut() {
            for contact in arbiter.contacts_mut().iter_mut() {
                contact.prepare_for_iteration(bodies, dt);
            }
        }
        for (constraint, _) in constraints.iter_mut().zip(&awake).filter(|(_, awake)| **awake) {
            constraint.prepare_for_iteration(bodies, dt);
        }

        for _ in 0..self.iterations {
            for arbiter in arbiters.iter_mut() {
                for contact in arbiter.contacts_mut().iter_mut() {
                    contact.iterate(bodies);
                }
            }
            for (constraint, _) in constraints.iter_mut().zip(&awake).filter(|(_, awake)| **awake) {
                constraint.iterate(bodies);
            }
        }

        for arbiter in arbiters.iter_mut() {
            metrics.record_arbiter(arbiter.contacts_mut());
        }
        metrics.constraints_solved = awake.iter().filter(|awake| **awake).count();
        metrics.constraints_skipped = awake.len() - metrics.constraints_solved;
        metrics
    }
}
