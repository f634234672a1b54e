use glam::{Mat3, Vec3};

use crate::{
    config::ContactSettings,
    core::{
        constraints::{BodySet, Constraint},
        rigidbody::RigidBody,
        types::MaterialPairProperties,
    },
    utils::allocator::BodyHandle,
};

/// Denominators at or below this are treated as "no response".
const EFFECTIVE_MASS_EPSILON: f32 = 1.0e-9;

/// One persistent point of a contact manifold.
///
/// The normal points from body1 towards body2 and penetration is positive
/// when the bodies overlap. Impulses accumulate across iterations and, when the
/// point survives into the next step, are rescaled and re-applied as a warm start.
#[derive(Debug, Clone)]
pub struct Contact {
    body1: BodyHandle,
    body2: BodyHandle,
    normal: Vec3,
    tangent: Vec3,
    position1: Vec3,
    position2: Vec3,
    local_anchor1: Vec3,
    local_anchor2: Vec3,
    relative_position1: Vec3,
    relative_position2: Vec3,
    accumulated_normal_impulse: f32,
    accumulated_tangent_impulse: f32,
    penetration: f32,
    initial_penetration: f32,
    material: MaterialPairProperties,
    friction: f32,
    mass_normal: f32,
    mass_tangent: f32,
    restitution_bias: f32,
    speculative_velocity: f32,
    lost_speculative_bounce: f32,
    new_contact: bool,
    treat_body1_as_static: bool,
    treat_body2_as_static: bool,
    body1_is_particle: bool,
    body2_is_particle: bool,
    last_time_step: f32,
    settings: ContactSettings,
}

impl Default for Contact {
    fn default() -> Self {
        Self {
            body1: BodyHandle::default(),
            body2: BodyHandle::default(),
            normal: Vec3::ZERO,
            tangent: Vec3::ZERO,
            position1: Vec3::ZERO,
            position2: Vec3::ZERO,
            local_anchor1: Vec3::ZERO,
            local_anchor2: Vec3::ZERO,
            relative_position1: Vec3::ZERO,
            relative_position2: Vec3::ZERO,
            accumulated_normal_impulse: 0.0,
            accumulated_tangent_impulse: 0.0,
            penetration: 0.0,
            initial_penetration: 0.0,
            material: MaterialPairProperties::default(),
            friction: 0.0,
            mass_normal: 0.0,
            mass_tangent: 0.0,
            restitution_bias: 0.0,
            speculative_velocity: 0.0,
            lost_speculative_bounce: 0.0,
            new_contact: false,
            treat_body1_as_static: false,
            treat_body2_as_static: false,
            body1_is_particle: false,
            body2_is_particle: false,
            last_time_step: f32::INFINITY,
            settings: ContactSettings::default(),
        }
    }
}

impl Contact {
    /// Builds a brand-new point: impulses zeroed, materials mixed, and the
    /// per-contact static flags latched from the bodies.
    pub fn new(
        body1: &RigidBody,
        body2: &RigidBody,
        point1: Vec3,
        point2: Vec3,
        normal: Vec3,
        penetration: f32,
        settings: &ContactSettings,
    ) -> Self {
        let mut contact = Self {
            body1: body1.handle(),
            body2: body2.handle(),
            material: body1
                .material
                .combine_with(&body2.material, settings.material_mixing),
            new_contact: true,
            treat_body1_as_static: body1.is_static(),
            treat_body2_as_static: body2.is_static(),
            initial_penetration: penetration,
            ..Self::default()
        };
        contact.set_geometry(body1, body2, point1, point2, normal, penetration, settings);
        contact
    }

    /// Replaces the geometry of a surviving point. Impulses, mixed material and
    /// static flags are carried over and restitution is not re-armed.
    #[allow(clippy::too_many_arguments)]
    pub fn refresh(
        &mut self,
        body1: &RigidBody,
        body2: &RigidBody,
        point1: Vec3,
        point2: Vec3,
        normal: Vec3,
        penetration: f32,
        settings: &ContactSettings,
    ) {
        self.new_contact = false;
        self.set_geometry(body1, body2, point1, point2, normal, penetration, settings);
    }

    #[allow(clippy::too_many_arguments)]
    fn set_geometry(
        &mut self,
        body1: &RigidBody,
        body2: &RigidBody,
        point1: Vec3,
        point2: Vec3,
        normal: Vec3,
        penetration: f32,
        settings: &ContactSettings,
    ) {
        self.normal = normal.normalize_or_zero();
        self.position1 = point1;
        self.position2 = point2;
        self.penetration = penetration;
        self.relative_position1 = point1 - body1.position();
        self.relative_position2 = point2 - body2.position();
        self.local_anchor1 = body1.to_local(point1);
        self.local_anchor2 = body2.to_local(point2);
        self.body1_is_particle = body1.is_particle();
        self.body2_is_particle = body2.is_particle();
        self.settings = *settings;
    }

    /// Recomputes world positions and penetration from the body-local anchors
    /// after the bodies have moved.
    pub fn update_position(&mut self, body1: &RigidBody, body2: &RigidBody) {
        self.position1 = body1.to_world(self.local_anchor1);
        self.position2 = body2.to_world(self.local_anchor2);
        self.relative_position1 = self.position1 - body1.position();
        self.relative_position2 = self.position2 - body2.position();
        self.penetration = (self.position1 - self.position2).dot(self.normal);
    }

    /// Squared offset between the two anchors perpendicular to the normal.
    pub fn tangential_drift_squared(&self) -> f32 {
        let diff = self.position1 - self.position2;
        let along = diff.dot(self.normal);
        (diff - self.normal * along).length_squared()
    }

    /// Scales both accumulated impulses, as done for a change of timestep.
    pub fn rescale_impulses(&mut self, ratio: f32) {
        self.accumulated_normal_impulse *= ratio;
        self.accumulated_tangent_impulse *= ratio;
    }

    /// Pins one of the bodies for the rest of this contact's life.
    pub fn set_treat_body_as_static(&mut self, body: BodyHandle, pinned: bool) {
        if body == self.body1 {
            self.treat_body1_as_static = pinned;
        }
        if body == self.body2 {
            self.treat_body2_as_static = pinned;
        }
    }

    pub fn body1(&self) -> BodyHandle {
        self.body1
    }

    pub fn body2(&self) -> BodyHandle {
        self.body2
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn tangent(&self) -> Vec3 {
        self.tangent
    }

    pub fn position1(&self) -> Vec3 {
        self.position1
    }

    pub fn position2(&self) -> Vec3 {
        self.position2
    }

    pub fn relative_position1(&self) -> Vec3 {
        self.relative_position1
    }

    pub fn relative_position2(&self) -> Vec3 {
        self.relative_position2
    }

    pub fn penetration(&self) -> f32 {
        self.penetration
    }

    pub fn initial_penetration(&self) -> f32 {
        self.initial_penetration
    }

    pub fn accumulated_normal_impulse(&self) -> f32 {
        self.accumulated_normal_impulse
    }

    pub fn accumulated_tangent_impulse(&self) -> f32 {
        self.accumulated_tangent_impulse
    }

    pub fn material(&self) -> MaterialPairProperties {
        self.material
    }

    /// Friction coefficient selected by the last prepare.
    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn mass_normal(&self) -> f32 {
        self.mass_normal
    }

    pub fn mass_tangent(&self) -> f32 {
        self.mass_tangent
    }

    pub fn restitution_bias(&self) -> f32 {
        self.restitution_bias
    }

    pub fn speculative_velocity(&self) -> f32 {
        self.speculative_velocity
    }

    pub fn lost_speculative_bounce(&self) -> f32 {
        self.lost_speculative_bounce
    }

    pub fn is_new(&self) -> bool {
        self.new_contact
    }

    pub fn treats_body1_as_static(&self) -> bool {
        self.treat_body1_as_static
    }

    pub fn treats_body2_as_static(&self) -> bool {
        self.treat_body2_as_static
    }

    pub fn last_time_step(&self) -> f32 {
        self.last_time_step
    }

    fn skips(&self, body1: &RigidBody, body2: &RigidBody) -> (bool, bool) {
        (
            self.treat_body1_as_static || !body1.is_dynamic(),
            self.treat_body2_as_static || !body2.is_dynamic(),
        )
    }

    fn relative_velocity(&self, body1: &RigidBody, body2: &RigidBody) -> Vec3 {
        let mut dv = body2.linear_velocity - body1.linear_velocity;
        if !self.body1_is_particle {
            dv -= body1.angular_velocity.cross(self.relative_position1);
        }
        if !self.body2_is_particle {
            dv += body2.angular_velocity.cross(self.relative_position2);
        }
        dv
    }

    /// Generalised inverse mass of both bodies along `direction`.
    fn inverse_effective_mass(
        &self,
        body1: &RigidBody,
        body2: &RigidBody,
        direction: Vec3,
        skip: (bool, bool),
    ) -> f32 {
        let mut k = 0.0;
        if !skip.0 {
            k += body1.inverse_mass
                + angular_term(
                    &body1.inverse_inertia_world,
                    self.relative_position1,
                    direction,
                    self.body1_is_particle,
                );
        }
        if !skip.1 {
            k += body2.inverse_mass
                + angular_term(
                    &body2.inverse_inertia_world,
                    self.relative_position2,
                    direction,
                    self.body2_is_particle,
                );
        }
        k
    }

    fn apply_impulse(
        &self,
        body1: &mut RigidBody,
        body2: &mut RigidBody,
        impulse: Vec3,
        skip: (bool, bool),
    ) {
        if !skip.0 {
            body1.linear_velocity -= impulse * body1.inverse_mass;
            if !self.body1_is_particle {
                body1.angular_velocity -=
                    body1.inverse_inertia_world * self.relative_position1.cross(impulse);
            }
        }
        if !skip.1 {
            body2.linear_velocity += impulse * body2.inverse_mass;
            if !self.body2_is_particle {
                body2.angular_velocity +=
                    body2.inverse_inertia_world * self.relative_position2.cross(impulse);
            }
        }
    }

    /// Per-step setup: effective masses, bias terms, friction selection and
    /// the warm-start impulse.
    pub fn prepare(&mut self, body1: &mut RigidBody, body2: &mut RigidBody, dt: f32) {
        let skip = self.skips(body1, body2);
        let dv = self.relative_velocity(body1, body2);

        let k_normal = self.inverse_effective_mass(body1, body2, self.normal, skip);
        self.mass_normal = invert_or_zero(k_normal);

        let normal_velocity = self.normal.dot(dv);
        self.tangent = (dv - self.normal * normal_velocity).normalize_or_zero();

        let k_tangent = self.inverse_effective_mass(body1, body2, self.tangent, skip);
        self.mass_tangent = if self.tangent == Vec3::ZERO {
            0.0
        } else {
            invert_or_zero(k_tangent)
        };

        let settings = self.settings;
        self.restitution_bias = self.lost_speculative_bounce;
        self.speculative_velocity = 0.0;

        if self.penetration > settings.allowed_penetration {
            let correction = (self.penetration - settings.allowed_penetration).max(0.0);
            self.restitution_bias = (settings.bias_factor / dt * correction)
                .max(0.0)
                .min(settings.maximum_bias);
        }

        self.rescale_impulses(dt / self.last_time_step);

        let required_tangent_impulse = self.mass_tangent * -self.tangent.dot(dv);
        let static_limit = -self.material.static_friction * self.accumulated_normal_impulse;
        self.friction = if required_tangent_impulse < static_limit {
            self.material.kinetic_friction
        } else {
            self.material.static_friction
        };
        let cap = (self.friction * self.accumulated_normal_impulse).abs();
        self.accumulated_tangent_impulse = self.accumulated_tangent_impulse.max(-cap).min(cap);

        if normal_velocity < -settings.restitution_velocity_threshold && self.new_contact {
            self.restitution_bias =
                (-self.material.restitution * normal_velocity).max(self.restitution_bias);
        }

        if self.penetration < -settings.allowed_penetration {
            self.speculative_velocity = self.penetration / dt;
            self.lost_speculative_bounce = self.restitution_bias;
            self.restitution_bias = 0.0;
        } else {
            self.lost_speculative_bounce = 0.0;
        }

        let impulse = self.normal * self.accumulated_normal_impulse
            + self.tangent * self.accumulated_tangent_impulse;
        self.apply_impulse(body1, body2, impulse, skip);

        self.last_time_step = dt;
        self.new_contact = false;
    }

    /// One Gauss-Seidel pass over this point.
    pub fn solve(&mut self, body1: &mut RigidBody, body2: &mut RigidBody) {
        let skip = self.skips(body1, body2);
        if skip.0 && skip.1 {
            return;
        }

        let dv = self.relative_velocity(body1, body2);
        let min_velocity = self.settings.minimum_velocity;
        if dv.length_squared() < min_velocity * min_velocity {
            return;
        }

        let vn = self.normal.dot(dv);
        let normal_impulse =
            self.mass_normal * (-vn + self.restitution_bias + self.speculative_velocity);
        let old_normal = self.accumulated_normal_impulse;
        self.accumulated_normal_impulse = (old_normal + normal_impulse).max(0.0);
        let normal_impulse = self.accumulated_normal_impulse - old_normal;

        let vt = self.tangent.dot(dv);
        let cap = (self.friction * self.accumulated_normal_impulse).abs();
        let tangent_impulse = self.mass_tangent * -vt;
        let old_tangent = self.accumulated_tangent_impulse;
        self.accumulated_tangent_impulse = (old_tangent + tangent_impulse).max(-cap).min(cap);
        let tangent_impulse = self.accumulated_tangent_impulse - old_tangent;

        let impulse = self.normal * normal_impulse + self.tangent * tangent_impulse;
        self.apply_impulse(body1, body2, impulse, skip);
    }
}

impl Constraint for Contact {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body1, self.body2)
    }

    fn prepare_for_iteration(&mut self, bodies: &mut BodySet, dt: f32) {
        if let Some((body1, body2)) = bodies.get2_mut(self.body1, self.body2) {
            self.prepare(body1, body2, dt);
        }
    }

    fn iterate(&mut self, bodies: &mut BodySet) {
        if let Some((body1, body2)) = bodies.get2_mut(self.body1, self.body2) {
            self.solve(body1, body2);
        }
    }
}

/// `((I⁻¹ (r × d)) × r) · d`, zero for particles.
fn angular_term(inverse_inertia_world: &Mat3, r: Vec3, direction: Vec3, is_particle: bool) -> f32 {
    if is_particle {
        return 0.0;
    }
    (*inverse_inertia_world * r.cross(direction))
        .cross(r)
        .dot(direction)
}

fn invert_or_zero(k: f32) -> f32 {
    if k > EFFECTIVE_MASS_EPSILON && k.is_finite() {
        1.0 / k
    } else {
        0.0
    }
}
