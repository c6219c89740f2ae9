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

/// Rotates a local inverse inertia tensor into world space: `R * I^-1 * R^T`.
pub fn rotate_inverse_inertia(local_inverse: Mat3, orientation: Quat) -> Mat3 {
    let rotation = Mat3::from_quat(orientation);
    rotation * local_inverse * rotation.transpose()
}

/// Builds two unit tangents orthogonal to `normal` and to each other.
pub fn tangent_basis(normal: Vec3) -> (Vec3, Vec3) {
    let reference = if normal.x.abs() < 0.57 { Vec3::X } else { Vec3::Y };
    let t1 = normal.cross(reference).normalize_or_zero();
    let t2 = normal.cross(t1);
    (t1, t2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tangent_basis_is_orthonormal() {
        for normal in [Vec3::X, Vec3::Y, Vec3::new(1.0, 2.0, -3.0).normalize()] {
            let (t1, t2) = tangent_basis(normal);
            assert_abs_diff_eq!(t1.dot(normal), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(t2.dot(normal), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(t1.dot(t2), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(t1.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(t2.length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn identity_orientation_keeps_inertia() {
        let local = Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
        let world = rotate_inverse_inertia(local, Quat::IDENTITY);
        assert_abs_diff_eq!(world.x_axis.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(world.z_axis.z, 3.0, epsilon = 1e-6);
    }
}
