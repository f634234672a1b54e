use crate::{
    core::rigidbody::RigidBody,
    utils::allocator::{Arena, BodyHandle},
};

/// Authoritative body store the solver reads and writes through handles.
pub type BodySet = Arena<RigidBody>;

/// Two-phase velocity constraint shared by contacts and joints.
///
/// Within one step `prepare_for_iteration` runs for every constraint before
/// any `iterate` call. Implementations mutate only the velocities of the two
/// bodies they couple, and never touch static or inactive bodies.
pub trait Constraint: Send + Sync {
    fn bodies(&self) -> (BodyHandle, BodyHandle);

    fn prepare_for_iteration(&mut self, bodies: &mut BodySet, dt: f32);

    fn iterate(&mut self, bodies: &mut BodySet);
}
