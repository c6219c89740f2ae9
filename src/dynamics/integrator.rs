use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    config::DEFAULT_GRAVITY,
    core::types::{BodyInertia, Pose, Velocity},
    utils::math::{angular_velocity_to_quat, rotate_inverse_inertia},
};

/// How angular velocity is carried through a change of orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngularIntegrationMode {
    /// Angular velocity is left untouched; cheap and stable, loses momentum for asymmetric bodies.
    Nonconserving,
    /// Angular velocity is rescaled so world angular momentum survives the rotation.
    ConserveMomentum,
}

/// Hooks the stepper calls while integrating bodies.
///
/// `integrate_velocity` runs concurrently on many workers, one body per call,
/// so it may only read `self` and write the velocity it is given.
pub trait PoseIntegratorCallbacks: Send + Sync {
    fn angular_integration_mode(&self) -> AngularIntegrationMode;

    /// When false, bodies without contacts integrate their pose once per step instead of per substep.
    fn allow_substeps_for_unconstrained_bodies(&self) -> bool;

    fn integrate_velocity_for_kinematics(&self) -> bool;

    /// Called once per step before any `integrate_velocity` call.
    fn prepare_for_integration(&mut self, dt: f32);

    fn integrate_velocity(
        &self,
        pose: &Pose,
        inertia: &BodyInertia,
        velocity: &mut Velocity,
        worker_index: usize,
        dt: f32,
    );
}

/// Applies a constant gravity bias to every active dynamic body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravityIntegrator {
    gravity: Vec3,
    #[serde(skip)]
    gravity_dt: Vec3,
}

impl Default for GravityIntegrator {
    fn default() -> Self {
        Self::new(Vec3::from_array(DEFAULT_GRAVITY))
    }
}

impl GravityIntegrator {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            gravity_dt: Vec3::ZERO,
        }
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Takes effect at the next `prepare_for_integration`.
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Velocity change applied by the most recent step.
    pub fn gravity_delta(&self) -> Vec3 {
        self.gravity_dt
    }
}

impl PoseIntegratorCallbacks for GravityIntegrator {
    fn angular_integration_mode(&self) -> AngularIntegrationMode {
        AngularIntegrationMode::Nonconserving
    }

    fn allow_substeps_for_unconstrained_bodies(&self) -> bool {
        false
    }

    fn integrate_velocity_for_kinematics(&self) -> bool {
        false
    }

    fn prepare_for_integration(&mut self, dt: f32) {
        self.gravity_dt = self.gravity * dt;
    }

    fn integrate_velocity(
        &self,
        _pose: &Pose,
        _inertia: &BodyInertia,
        velocity: &mut Velocity,
        _worker_index: usize,
        _dt: f32,
    ) {
        velocity.linear += self.gravity_dt;
    }
}

/// Advances a pose by its velocity over `dt`.
pub fn integrate_pose(
    pose: &mut Pose,
    velocity: &mut Velocity,
    inertia: &BodyInertia,
    mode: AngularIntegrationMode,
    dt: f32,
) {
    pose.position += velocity.linear * dt;

    let previous_orientation = pose.orientation;
    let delta = angular_velocity_to_quat(velocity.angular, dt);
    pose.orientation = (delta * previous_orientation).normalize();

    if mode == AngularIntegrationMode::ConserveMomentum && !inertia.is_kinematic() {
        let previous_inverse =
            rotate_inverse_inertia(inertia.inverse_inertia_tensor, previous_orientation);
        if previous_inverse.determinant() != 0.0 {
            let momentum = previous_inverse.inverse() * velocity.angular;
            let current_inverse =
                rotate_inverse_inertia(inertia.inverse_inertia_tensor, pose.orientation);
            velocity.angular = current_inverse * momentum;
        }
    }
}
