//! Error types for the contact dynamics core.
//!
//! Only API misuse is reported here. Degenerate geometry is absorbed by the
//! solver and never surfaces as an error.

use thiserror::Error;

use crate::utils::allocator::BodyHandle;

/// Errors raised by body mutation and world stepping.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DynamicsError {
    #[error("Cannot {operation} on a static body")]
    StaticBody { operation: &'static str },
    #[error("Invalid timestep: {0}")]
    InvalidTimestep(f32),
    #[error("Mass must be positive, got {0}")]
    InvalidMass(f32),
    #[error("Unknown body: {0}")]
    UnknownBody(BodyHandle),
    #[error("Solver needs at least one iteration")]
    InvalidIterations,
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, DynamicsError>;
