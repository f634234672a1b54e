//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// Advances an orientation by the exponential map of `angular * dt`.
///
/// The result is re-orthonormalised through a quaternion so drift does not
/// accumulate over many steps.
pub fn integrate_orientation(orientation: &Mat3, angular: Vec3, dt: f32) -> Mat3 {
    let delta = angular_velocity_to_quat(angular, dt);
    let current = Quat::from_mat3(orientation);
    Mat3::from_quat((delta * current).normalize())
}

/// Rotates a body-space inverse inertia tensor into world space: `R I⁻¹ Rᵀ`.
pub fn world_inverse_inertia(orientation: &Mat3, inverse_inertia: &Mat3) -> Mat3 {
    *orientation * *inverse_inertia * orientation.transpose()
}

/// Inverts a tensor, treating a singular one as "no rotational response".
pub fn safe_inverse(matrix: &Mat3) -> Mat3 {
    let det = matrix.determinant();
    if det == 0.0 || !det.is_finite() {
        Mat3::ZERO
    } else {
        matrix.inverse()
    }
}

/// Axis-angle error vector that rotates `from` onto `to`.
pub fn rotation_error(from: &Mat3, to: &Mat3) -> Vec3 {
    let delta = Quat::from_mat3(&(*to * from.transpose())).normalize();
    let (axis, angle) = delta.to_axis_angle();
    let angle = if angle > std::f32::consts::PI {
        angle - std::f32::consts::TAU
    } else {
        angle
    };
    axis * angle
}
