use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    core::{constraints::BodySet, rigidbody::RigidBody},
    utils::math::integrate_orientation,
};

/// Semi-implicit Euler integrator split around the velocity solver.
///
/// `integrate_forces` turns accumulated forces and gravity into velocity before
/// the constraints run; `integrate` moves bodies with the solved velocities.
#[derive(Debug, Clone)]
pub struct Integrator {
    parallel: bool,
    speculative: bool,
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            speculative: true,
        }
    }
}

impl Integrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled && cfg!(feature = "parallel");
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// When enabled, bounds are swept along the step's motion after integration.
    pub fn set_speculative(&mut self, enabled: bool) {
        self.speculative = enabled;
    }

    pub fn integrate_forces(&self, bodies: &mut BodySet, gravity: Vec3, dt: f32) {
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                bodies
                    .par_values_mut()
                    .for_each(|body| Self::integrate_body_forces(body, gravity, dt));
                return;
            }
        }

        for body in bodies.values_mut() {
            Self::integrate_body_forces(body, gravity, dt);
        }
    }

    pub fn integrate(&self, bodies: &mut BodySet, dt: f32) {
        let speculative = self.speculative;

        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                bodies
                    .par_values_mut()
                    .for_each(|body| Self::integrate_body(body, dt, speculative));
                return;
            }
        }

        for body in bodies.values_mut() {
            Self::integrate_body(body, dt, speculative);
        }
    }

    fn integrate_body_forces(body: &mut RigidBody, gravity: Vec3, dt: f32) {
        if !body.is_dynamic() {
            body.clear_forces();
            return;
        }

        let mut acceleration = body.force * body.inverse_mass;
        if body.affected_by_gravity {
            acceleration += gravity;
        }
        body.linear_velocity += acceleration * dt;

        if !body.is_particle {
            body.angular_velocity += body.inverse_inertia_world * body.torque * dt;
        }

        body.clear_forces();
    }

    fn integrate_body(body: &mut RigidBody, dt: f32, speculative: bool) {
        if !body.is_dynamic() {
            return;
        }

        body.position += body.linear_velocity * dt;
        if !body.is_particle {
            body.orientation = integrate_orientation(&body.orientation, body.angular_velocity, dt);
        }

        body.linear_velocity *= (1.0 - body.linear_damping * dt).max(0.0);
        body.angular_velocity *= (1.0 - body.angular_damping * dt).max(0.0);

        body.update();
        if speculative {
            body.swept_expand_bounding_box(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collider::ColliderShape;
    use approx::assert_relative_eq;

    fn single(body: RigidBody) -> (BodySet, crate::utils::allocator::BodyHandle) {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(body);
        (bodies, handle)
    }

    #[test]
    fn gravity_and_force_accelerate_dynamic_bodies() {
        let mut body = RigidBody::new(ColliderShape::sphere(0.5));
        body.set_mass(2.0).unwrap();
        body.add_force(Vec3::new(4.0, 0.0, 0.0));
        let (mut bodies, handle) = single(body);

        let integrator = Integrator::new();
        integrator.integrate_forces(&mut bodies, Vec3::new(0.0, -10.0, 0.0), 0.5);
        let body = bodies.get(handle).unwrap();
        assert_relative_eq!(body.linear_velocity(), Vec3::new(1.0, -5.0, 0.0));
        assert_eq!(body.force(), Vec3::ZERO);
    }

    #[test]
    fn static_bodies_do_not_move() {
        let (mut bodies, handle) = single(RigidBody::fixed(ColliderShape::sphere(1.0)));
        let integrator = Integrator::new();
        integrator.integrate_forces(&mut bodies, Vec3::new(0.0, -10.0, 0.0), 1.0);
        integrator.integrate(&mut bodies, 1.0);
        let body = bodies.get(handle).unwrap();
        assert_eq!(body.position(), Vec3::ZERO);
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
    }

    #[test]
    fn rotation_follows_angular_velocity() {
        let mut body = RigidBody::new(ColliderShape::cuboid(Vec3::splat(0.5)));
        body.set_angular_velocity(Vec3::new(0.0, 0.0, std::f32::consts::PI)).unwrap();
        let (mut bodies, handle) = single(body);

        let mut integrator = Integrator::new();
        integrator.set_parallel(false);
        integrator.integrate(&mut bodies, 0.5);
        let body = bodies.get(handle).unwrap();
        let x_axis = body.orientation() * Vec3::X;
        assert_relative_eq!(x_axis, Vec3::Y, epsilon = 1e-5);
        assert_relative_eq!(
            body.inverse_orientation() * body.orientation(),
            glam::Mat3::IDENTITY,
            epsilon = 1e-5
        );
    }

    #[test]
    fn damping_never_reverses_velocity() {
        let mut body = RigidBody::new(ColliderShape::sphere(0.5));
        body.linear_damping = 100.0;
        body.set_linear_velocity(Vec3::X).unwrap();
        let (mut bodies, handle) = single(body);

        Integrator::new().integrate(&mut bodies, 1.0);
        assert_eq!(bodies.get(handle).unwrap().linear_velocity(), Vec3::ZERO);
    }

    #[test]
    fn swept_bounds_cover_the_step() {
        let mut body = RigidBody::new(ColliderShape::sphere(0.5));
        body.set_linear_velocity(Vec3::new(0.0, -6.0, 0.0)).unwrap();
        let (mut bodies, handle) = single(body);

        Integrator::new().integrate(&mut bodies, 0.5);
        let bounds = bodies.get(handle).unwrap().bounding_box();
        assert!(bounds.min.y <= -6.0 + 1e-5);
        assert!(bounds.max.y >= -3.0 + 0.5 - 1e-5);
    }
}
