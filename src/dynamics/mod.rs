//! Velocity-level dynamics: contact points, joints, the sequential-impulse solver and integration.

pub mod contact;
pub mod integrator;
pub mod joints;
pub mod solver;

pub use contact::Contact;
pub use integrator::Integrator;
pub use joints::{FixedAngle, PointOnLine};
pub use solver::{ContactSolver, SolverStepMetrics};
