use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position and orientation of a body or static.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Builds a homogeneous matrix for drawing a mesh of the given size.
    pub fn to_matrix(&self, scale: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(scale, self.orientation, self.position)
    }

    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.orientation.conjugate() * (world - self.position)
    }
}

/// Linear and angular velocity of a rigid body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }

    pub fn squared_magnitude(&self) -> f32 {
        self.linear.length_squared() + self.angular.length_squared()
    }
}

/// Inverse mass and local inverse inertia. Zeroes mean infinite mass (kinematic).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyInertia {
    pub inverse_mass: f32,
    pub inverse_inertia_tensor: Mat3,
}

impl Default for BodyInertia {
    fn default() -> Self {
        Self {
            inverse_mass: 1.0,
            inverse_inertia_tensor: Mat3::IDENTITY,
        }
    }
}

impl BodyInertia {
    pub fn kinematic() -> Self {
        Self {
            inverse_mass: 0.0,
            inverse_inertia_tensor: Mat3::ZERO,
        }
    }

    pub fn is_kinematic(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Inverts a mass and inertia tensor pair.
    pub fn from_mass_properties(mass: f32, inertia: Mat3) -> Self {
        let inverse_mass = if mass.abs() < f32::EPSILON {
            0.0
        } else {
            1.0 / mass
        };
        // Small bodies have tiny determinants, so only reject exact singularity.
        let inverse_inertia_tensor = if inertia.determinant() == 0.0 {
            Mat3::ZERO
        } else {
            let inverse = inertia.inverse();
            if inverse.is_finite() {
                inverse
            } else {
                Mat3::ZERO
            }
        };
        Self {
            inverse_mass,
            inverse_inertia_tensor,
        }
    }
}

/// Helper methods for inertia calculations.
pub trait InertiaTensorExt {
    fn for_solid_box(half_extents: Vec3, mass: f32) -> Mat3;
    fn for_solid_sphere(radius: f32, mass: f32) -> Mat3;
}

impl InertiaTensorExt for Mat3 {
    fn for_solid_box(half_extents: Vec3, mass: f32) -> Mat3 {
        let lx = half_extents.x * 2.0;
        let ly = half_extents.y * 2.0;
        let lz = half_extents.z * 2.0;
        let factor = mass / 12.0;
        Mat3::from_diagonal(Vec3::new(
            factor * (ly * ly + lz * lz),
            factor * (lx * lx + lz * lz),
            factor * (lx * lx + ly * ly),
        ))
    }

    fn for_solid_sphere(radius: f32, mass: f32) -> Mat3 {
        let value = 0.4 * mass * radius * radius;
        Mat3::from_diagonal(Vec3::splat(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_cube_inertia_matches_closed_form() {
        let inertia = Mat3::for_solid_box(Vec3::splat(0.5), 1.0);
        assert_relative_eq!(inertia.x_axis.x, 1.0 / 6.0, epsilon = 1e-6);
        assert_relative_eq!(inertia.y_axis.y, 1.0 / 6.0, epsilon = 1e-6);
    }

    #[test]
    fn inverse_of_zero_mass_is_kinematic() {
        let inertia = BodyInertia::from_mass_properties(0.0, Mat3::ZERO);
        assert!(inertia.is_kinematic());
        assert_eq!(inertia.inverse_inertia_tensor, Mat3::ZERO);
    }

    #[test]
    fn small_boxes_keep_finite_inverse_inertia() {
        let inertia =
            BodyInertia::from_mass_properties(1.0, Mat3::for_solid_box(Vec3::splat(0.05), 1.0));
        assert_relative_eq!(inertia.inverse_inertia_tensor.x_axis.x, 600.0, epsilon = 0.1);
    }

    #[test]
    fn pose_round_trips_points() {
        let pose = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let local = Vec3::new(0.5, -0.25, 2.0);
        let back = pose.inverse_transform_point(pose.transform_point(local));
        assert_relative_eq!(back.x, local.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, local.z, epsilon = 1e-5);
    }
}
