//! Two-body joints solved alongside contacts.

use glam::{Mat3, Vec3};

use crate::{
    core::{
        constraints::{BodySet, Constraint},
        rigidbody::RigidBody,
    },
    utils::{
        allocator::BodyHandle,
        math::{rotation_error, safe_inverse},
    },
};

/// Locks the relative orientation of two bodies to the one they had when the
/// joint was created.
#[derive(Debug, Clone)]
pub struct FixedAngle {
    body1: BodyHandle,
    body2: BodyHandle,
    /// Relative orientation `R2 · R1ᵀ` captured at creation.
    initial_relative: Mat3,
    bias_factor: f32,
    softness: f32,
    effective_mass: Mat3,
    bias: Vec3,
    accumulated_impulse: Vec3,
    softness_over_dt: f32,
}

impl FixedAngle {
    pub const DEFAULT_BIAS_FACTOR: f32 = 0.05;

    pub fn new(body1: &RigidBody, body2: &RigidBody) -> Self {
        Self {
            body1: body1.handle(),
            body2: body2.handle(),
            initial_relative: body2.orientation() * body1.inverse_orientation(),
            bias_factor: Self::DEFAULT_BIAS_FACTOR,
            softness: 0.0,
            effective_mass: Mat3::ZERO,
            bias: Vec3::ZERO,
            accumulated_impulse: Vec3::ZERO,
            softness_over_dt: 0.0,
        }
    }

    pub fn with_bias_factor(mut self, bias_factor: f32) -> Self {
        self.bias_factor = bias_factor;
        self
    }

    pub fn with_softness(mut self, softness: f32) -> Self {
        self.softness = softness;
        self
    }

    pub fn bias_factor(&self) -> f32 {
        self.bias_factor
    }

    pub fn softness(&self) -> f32 {
        self.softness
    }

    pub fn applied_impulse(&self) -> Vec3 {
        self.accumulated_impulse
    }

    fn prepare(&mut self, body1: &mut RigidBody, body2: &mut RigidBody, dt: f32) {
        let inv1 = Self::inertia_of(body1);
        let inv2 = Self::inertia_of(body2);

        self.softness_over_dt = self.softness / dt;
        self.effective_mass =
            safe_inverse(&(inv1 + inv2 + Mat3::from_diagonal(Vec3::splat(self.softness_over_dt))));

        let target = self.initial_relative.transpose() * body2.orientation();
        let error = rotation_error(&target, &body1.orientation());
        self.bias = error * (self.bias_factor / dt);

        Self::apply(body1, body2, self.accumulated_impulse);
    }

    fn solve(&mut self, body1: &mut RigidBody, body2: &mut RigidBody) {
        let jv = body1.angular_velocity - body2.angular_velocity;
        let soft = self.accumulated_impulse * self.softness_over_dt;
        let lambda = -(self.effective_mass * (jv + self.bias + soft));
        self.accumulated_impulse += lambda;
        Self::apply(body1, body2, lambda);
    }

    fn inertia_of(body: &RigidBody) -> Mat3 {
        if body.is_dynamic() {
            body.inverse_inertia_world
        } else {
            Mat3::ZERO
        }
    }

    fn apply(body1: &mut RigidBody, body2: &mut RigidBody, impulse: Vec3) {
        if body1.is_dynamic() {
            body1.angular_velocity += body1.inverse_inertia_world * impulse;
        }
        if body2.is_dynamic() {
            body2.angular_velocity -= body2.inverse_inertia_world * impulse;
        }
    }
}

impl Constraint for FixedAngle {
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

/// Keeps a point fixed on body 2 on a line fixed in body 1.
///
/// The joint removes the one relative direction, perpendicular to the line,
/// along which the point currently drifts; motion along the line stays free.
#[derive(Debug, Clone)]
pub struct PointOnLine {
    body1: BodyHandle,
    body2: BodyHandle,
    /// Line origin relative to body 1, in body space.
    local_anchor1: Vec3,
    /// Constrained point relative to body 2, in body space.
    local_anchor2: Vec3,
    /// Line direction in body 1's space.
    local_axis: Vec3,
    bias_factor: f32,
    softness: f32,
    jacobian: [Vec3; 4],
    effective_mass: f32,
    bias: f32,
    accumulated_impulse: f32,
    softness_over_dt: f32,
}

impl PointOnLine {
    pub const DEFAULT_BIAS_FACTOR: f32 = 0.5;

    /// `line_origin` and `point` are world-space positions; `line_direction`
    /// is a world-space direction captured in body 1's frame. A zero direction
    /// falls back to the line through `line_origin` and `point`, then to +X.
    pub fn new(
        body1: &RigidBody,
        body2: &RigidBody,
        line_origin: Vec3,
        line_direction: Vec3,
        point: Vec3,
    ) -> Self {
        let direction = line_direction
            .try_normalize()
            .or_else(|| (line_origin - point).try_normalize())
            .unwrap_or(Vec3::X);

        Self {
            body1: body1.handle(),
            body2: body2.handle(),
            local_anchor1: body1.inverse_orientation() * (line_origin - body1.position()),
            local_anchor2: body2.inverse_orientation() * (point - body2.position()),
            local_axis: body1.inverse_orientation() * direction,
            bias_factor: Self::DEFAULT_BIAS_FACTOR,
            softness: 0.0,
            jacobian: [Vec3::ZERO; 4],
            effective_mass: 0.0,
            bias: 0.0,
            accumulated_impulse: 0.0,
            softness_over_dt: 0.0,
        }
    }

    pub fn with_bias_factor(mut self, bias_factor: f32) -> Self {
        self.bias_factor = bias_factor;
        self
    }

    pub fn with_softness(mut self, softness: f32) -> Self {
        self.softness = softness;
        self
    }

    pub fn bias_factor(&self) -> f32 {
        self.bias_factor
    }

    pub fn softness(&self) -> f32 {
        self.softness
    }

    pub fn applied_impulse(&self) -> f32 {
        self.accumulated_impulse
    }

    /// Line origin and tracked point in world space.
    pub fn world_anchors(&self, body1: &RigidBody, body2: &RigidBody) -> (Vec3, Vec3) {
        (
            body1.to_world(self.local_anchor1),
            body2.to_world(self.local_anchor2),
        )
    }

    fn prepare(&mut self, body1: &mut RigidBody, body2: &mut RigidBody, dt: f32) {
        let r1 = body1.orientation() * self.local_anchor1;
        let r2 = body2.orientation() * self.local_anchor2;
        let p1 = body1.position() + r1;
        let p2 = body2.position() + r2;
        let axis = body1.orientation() * self.local_axis;

        let offset = p2 - p1;
        let perpendicular = offset - axis * axis.dot(offset);
        let direction = perpendicular.normalize_or_zero();

        // Body 1 is pushed at the tracked point, so its lever arm ends at p2.
        let lever1 = r1 + offset;
        self.jacobian = [
            -direction,
            -lever1.cross(direction),
            direction,
            r2.cross(direction),
        ];

        let inv1 = Self::inverse_mass_of(body1);
        let inv2 = Self::inverse_mass_of(body2);
        self.softness_over_dt = self.softness / dt;
        let k = inv1.0
            + inv2.0
            + self.jacobian[1].dot(inv1.1 * self.jacobian[1])
            + self.jacobian[3].dot(inv2.1 * self.jacobian[3])
            + self.softness_over_dt;
        self.effective_mass = if k > 1e-9 { 1.0 / k } else { 0.0 };

        self.bias = perpendicular.length() * (self.bias_factor / dt);

        self.apply(body1, body2, self.accumulated_impulse);
    }

    fn solve(&mut self, body1: &mut RigidBody, body2: &mut RigidBody) {
        let jv = self.jacobian[0].dot(body1.linear_velocity)
            + self.jacobian[1].dot(body1.angular_velocity)
            + self.jacobian[2].dot(body2.linear_velocity)
            + self.jacobian[3].dot(body2.angular_velocity);
        let soft = self.accumulated_impulse * self.softness_over_dt;
        let lambda = -self.effective_mass * (jv + self.bias + soft);
        self.accumulated_impulse += lambda;
        self.apply(body1, body2, lambda);
    }

    fn inverse_mass_of(body: &RigidBody) -> (f32, Mat3) {
        if body.is_dynamic() {
            (body.inverse_mass, body.inverse_inertia_world)
        } else {
            (0.0, Mat3::ZERO)
        }
    }

    fn apply(&self, body1: &mut RigidBody, body2: &mut RigidBody, lambda: f32) {
        if body1.is_dynamic() {
            body1.linear_velocity += self.jacobian[0] * (lambda * body1.inverse_mass);
            body1.angular_velocity += body1.inverse_inertia_world * (self.jacobian[1] * lambda);
        }
        if body2.is_dynamic() {
            body2.linear_velocity += self.jacobian[2] * (lambda * body2.inverse_mass);
            body2.angular_velocity += body2.inverse_inertia_world * (self.jacobian[3] * lambda);
        }
    }
}

impl Constraint for PointOnLine {
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
