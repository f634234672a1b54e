//! Core types describing bodies, shapes, materials and the constraint contract.

pub mod types;
pub mod rigidbody;
pub mod collider;
pub mod constraints;

pub use types::{MassProperties, Material, MaterialPairProperties, MixingMode};
pub use rigidbody::RigidBody;
pub use collider::{Aabb, ColliderShape};
pub use constraints::{BodySet, Constraint};
