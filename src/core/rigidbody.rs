use glam::{Mat3, Vec3};

use super::{
    collider::{Aabb, ColliderShape},
    types::{MassProperties, Material},
};
use crate::{
    config::{DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING},
    error::{DynamicsError, Result},
    utils::{
        allocator::BodyHandle,
        math::{safe_inverse, world_inverse_inertia},
    },
};

/// Mutable simulation state for one rigid object.
///
/// Velocities are only written through the checked setters or by the solver
/// and integrator inside the crate. Static and inactive bodies keep zero
/// velocity; particle bodies keep zero inertia and identity orientation.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub(crate) handle: BodyHandle,
    pub(crate) shape: ColliderShape,
    pub(crate) position: Vec3,
    pub(crate) orientation: Mat3,
    pub(crate) inverse_orientation: Mat3,
    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    pub(crate) mass_properties: MassProperties,
    pub(crate) inverse_mass: f32,
    pub(crate) inertia: Mat3,
    pub(crate) inverse_inertia: Mat3,
    pub(crate) inverse_inertia_world: Mat3,
    pub(crate) is_static: bool,
    pub(crate) is_particle: bool,
    pub(crate) is_active: bool,
    pub(crate) bounding_box: Aabb,
    pub(crate) force: Vec3,
    pub(crate) torque: Vec3,
    pub material: Material,
    pub affected_by_gravity: bool,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl RigidBody {
    /// Creates a dynamic body with unit density mass properties for `shape`.
    pub fn new(shape: ColliderShape) -> Self {
        let mut body = Self {
            handle: BodyHandle::default(),
            shape,
            position: Vec3::ZERO,
            orientation: Mat3::IDENTITY,
            inverse_orientation: Mat3::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass_properties: MassProperties::default(),
            inverse_mass: 1.0,
            inertia: Mat3::IDENTITY,
            inverse_inertia: Mat3::IDENTITY,
            inverse_inertia_world: Mat3::IDENTITY,
            is_static: false,
            is_particle: false,
            is_active: true,
            bounding_box: Aabb::empty(),
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            material: Material::default(),
            affected_by_gravity: true,
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
        };
        body.apply_mass_properties(shape.mass_properties(1.0));
        body.update();
        body
    }

    /// Creates a static body, e.g. ground planes and walls.
    pub fn fixed(shape: ColliderShape) -> Self {
        let mut body = Self::new(shape);
        body.is_static = true;
        body.affected_by_gravity = false;
        body.update();
        body
    }

    /// Creates a body without rotational response.
    pub fn particle(shape: ColliderShape) -> Self {
        let mut body = Self::new(shape);
        body.set_particle(true);
        body
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    pub fn with_orientation(mut self, orientation: Mat3) -> Self {
        self.set_orientation(orientation);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update();
    }

    pub fn orientation(&self) -> Mat3 {
        self.orientation
    }

    /// Sets the orientation; ignored for particles, which stay at identity.
    pub fn set_orientation(&mut self, orientation: Mat3) {
        self.orientation = orientation;
        self.update();
    }

    pub fn inverse_orientation(&self) -> Mat3 {
        self.inverse_orientation
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) -> Result<()> {
        self.ensure_dynamic("set linear velocity")?;
        self.linear_velocity = velocity;
        Ok(())
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) -> Result<()> {
        self.ensure_dynamic("set angular velocity")?;
        if !self.is_particle {
            self.angular_velocity = velocity;
        }
        Ok(())
    }

    /// Applies an impulse through the centre of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3) -> Result<()> {
        self.ensure_dynamic("apply impulse")?;
        self.linear_velocity += impulse * self.inverse_mass;
        Ok(())
    }

    /// Applies an impulse at `relative_position`, an offset from the centre of mass in world space.
    pub fn apply_impulse_at(&mut self, impulse: Vec3, relative_position: Vec3) -> Result<()> {
        self.ensure_dynamic("apply impulse")?;
        self.linear_velocity += impulse * self.inverse_mass;
        if !self.is_particle {
            self.angular_velocity += self.inverse_inertia_world * relative_position.cross(impulse);
        }
        Ok(())
    }

    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Adds a force acting at a world-space point, producing torque about the centre of mass.
    pub fn add_force_at(&mut self, force: Vec3, point: Vec3) {
        self.force += force;
        self.torque += (point - self.position).cross(force);
    }

    pub fn add_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    pub fn mass(&self) -> f32 {
        self.mass_properties.mass
    }

    /// Changes the mass, scaling the inertia tensor proportionally.
    pub fn set_mass(&mut self, mass: f32) -> Result<()> {
        if !(mass > 0.0) || !mass.is_finite() {
            return Err(DynamicsError::InvalidMass(mass));
        }
        let scale = if self.mass_properties.mass > f32::EPSILON {
            mass / self.mass_properties.mass
        } else {
            1.0
        };
        self.apply_mass_properties(MassProperties {
            mass,
            inertia: self.mass_properties.inertia * scale,
        });
        self.update();
        Ok(())
    }

    /// Replaces mass and inertia. With `as_inverse` the arguments are the
    /// inverse mass and inverse inertia.
    pub fn set_mass_properties(
        &mut self,
        inertia: Mat3,
        mass: f32,
        as_inverse: bool,
    ) -> Result<()> {
        if !(mass > 0.0) {
            return Err(DynamicsError::InvalidMass(mass));
        }
        let props = if as_inverse {
            MassProperties {
                mass: 1.0 / mass,
                inertia: safe_inverse(&inertia),
            }
        } else {
            MassProperties { mass, inertia }
        };
        self.apply_mass_properties(props);
        self.update();
        Ok(())
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn inertia(&self) -> Mat3 {
        self.inertia
    }

    pub fn inverse_inertia(&self) -> Mat3 {
        self.inverse_inertia
    }

    pub fn inverse_inertia_world(&self) -> Mat3 {
        self.inverse_inertia_world
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Making a body static zeroes its velocities.
    pub fn set_static(&mut self, is_static: bool) {
        if is_static && !self.is_static {
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
        self.is_static = is_static;
        self.update();
    }

    pub fn is_particle(&self) -> bool {
        self.is_particle
    }

    pub fn set_particle(&mut self, is_particle: bool) {
        self.is_particle = is_particle;
        self.apply_mass_properties(self.mass_properties);
        self.update();
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Deactivated bodies have their velocities frozen at zero.
    pub fn set_active(&mut self, is_active: bool) {
        if !is_active {
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
        self.is_active = is_active;
    }

    /// True when constraints may change this body's velocity.
    pub fn is_dynamic(&self) -> bool {
        !self.is_static && self.is_active
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    /// Refreshes inverse orientation, world inverse inertia and bounds from the current pose.
    pub fn update(&mut self) {
        if self.is_particle {
            self.orientation = Mat3::IDENTITY;
            self.inverse_orientation = Mat3::IDENTITY;
            self.inverse_inertia_world = Mat3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        } else {
            self.inverse_orientation = self.orientation.transpose();
            if !self.is_static {
                self.inverse_inertia_world =
                    world_inverse_inertia(&self.orientation, &self.inverse_inertia);
            }
        }
        self.bounding_box = self.shape.bounding_box(self.position, &self.orientation);
    }

    /// Grows the bounds along the distance travelled this step.
    pub fn swept_expand_bounding_box(&mut self, dt: f32) {
        self.bounding_box.sweep(self.linear_velocity * dt);
    }

    /// Converts a world-space point into body space.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.inverse_orientation * (point - self.position)
    }

    /// Converts a body-space point into world space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.orientation * local + self.position
    }

    /// Velocity of a material point at `relative_position` from the centre of mass.
    pub fn point_velocity(&self, relative_position: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(relative_position)
    }

    fn apply_mass_properties(&mut self, props: MassProperties) {
        self.mass_properties = props;
        self.inverse_mass = if props.mass.abs() < f32::EPSILON {
            0.0
        } else {
            1.0 / props.mass
        };
        if self.is_particle {
            self.inertia = Mat3::ZERO;
            self.inverse_inertia = Mat3::ZERO;
        } else {
            self.inertia = props.inertia;
            self.inverse_inertia = safe_inverse(&props.inertia);
        }
    }

    fn ensure_dynamic(&self, operation: &'static str) -> Result<()> {
        if self.is_static {
            Err(DynamicsError::StaticBody { operation })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::InertiaTensorExt;

    fn unit_box() -> RigidBody {
        let mut body = RigidBody::new(ColliderShape::cuboid(Vec3::splat(0.5)));
        body.set_mass(1.0).unwrap();
        body
    }

    #[test]
    fn static_body_rejects_velocity_and_impulse() {
        let mut body = RigidBody::fixed(ColliderShape::sphere(1.0));
        assert_eq!(
            body.set_linear_velocity(Vec3::X),
            Err(DynamicsError::StaticBody { operation: "set linear velocity" })
        );
        assert!(body.set_angular_velocity(Vec3::Y).is_err());
        assert!(body.apply_impulse(Vec3::Y).is_err());
        assert!(body.apply_impulse_at(Vec3::Y, Vec3::X).is_err());
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
        assert_eq!(body.angular_velocity(), Vec3::ZERO);
    }

    #[test]
    fn making_static_zeroes_velocity() {
        let mut body = unit_box();
        body.set_linear_velocity(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        body.set_static(true);
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
    }

    #[test]
    fn deactivation_freezes_velocity() {
        let mut body = unit_box();
        body.set_linear_velocity(Vec3::X).unwrap();
        body.set_angular_velocity(Vec3::Y).unwrap();
        body.set_active(false);
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
        assert_eq!(body.angular_velocity(), Vec3::ZERO);
        assert!(!body.is_dynamic());
    }

    #[test]
    fn set_mass_scales_inertia() {
        let mut body = unit_box();
        body.set_mass(2.0).unwrap();
        let expected = Mat3::for_solid_box(Vec3::splat(0.5), 2.0);
        assert!(body.inertia().abs_diff_eq(expected, 1e-5));
        assert!((body.inverse_mass() - 0.5).abs() < 1e-6);
        assert_eq!(body.set_mass(0.0), Err(DynamicsError::InvalidMass(0.0)));
        assert!(body.set_mass(-1.0).is_err());
    }

    #[test]
    fn inverse_mass_properties_are_accepted() {
        let mut body = unit_box();
        body.set_mass_properties(Mat3::from_diagonal(Vec3::splat(4.0)), 0.25, true)
            .unwrap();
        assert!((body.mass() - 4.0).abs() < 1e-5);
        assert!((body.inverse_inertia().x_axis.x - 4.0).abs() < 1e-4);
    }

    #[test]
    fn particle_has_zero_inertia_terms() {
        let mut body = RigidBody::particle(ColliderShape::sphere(0.5));
        body.set_orientation(Mat3::from_rotation_x(1.0));
        assert_eq!(body.orientation(), Mat3::IDENTITY);
        assert_eq!(body.inverse_inertia_world(), Mat3::ZERO);
        assert_eq!(body.inertia(), Mat3::ZERO);

        body.apply_impulse_at(Vec3::X, Vec3::Y).unwrap();
        assert_eq!(body.angular_velocity(), Vec3::ZERO);
        assert!(body.linear_velocity().x > 0.0);

        body.set_particle(false);
        assert!(body.inverse_inertia_world().x_axis.x > 0.0);
    }

    #[test]
    fn world_inertia_tracks_orientation() {
        let mut body = RigidBody::new(ColliderShape::cuboid(Vec3::new(1.0, 0.1, 0.1)));
        let before = body.inverse_inertia_world();
        body.set_orientation(Mat3::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let after = body.inverse_inertia_world();
        assert!((before.x_axis.x - after.y_axis.y).abs() < 1e-3);
        assert!((before.x_axis.x - after.x_axis.x).abs() > 1.0);
    }

    #[test]
    fn force_at_point_produces_torque() {
        let mut body = unit_box();
        body.add_force_at(Vec3::Z, Vec3::X);
        assert_eq!(body.force(), Vec3::Z);
        assert_eq!(body.torque(), Vec3::X.cross(Vec3::Z));
        body.clear_forces();
        assert_eq!(body.torque(), Vec3::ZERO);
    }

    #[test]
    fn local_world_round_trip() {
        let body = unit_box()
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_orientation(Mat3::from_rotation_y(0.7));
        let point = Vec3::new(-0.3, 0.4, 2.0);
        assert!((body.to_world(body.to_local(point)) - point).length() < 1e-5);
    }
}
