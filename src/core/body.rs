use serde::{Deserialize, Serialize};

use super::types::{BodyInertia, Pose, Velocity};
use crate::{
    config::{DEFAULT_MINIMUM_SLEEP_TIMESTEPS, DEFAULT_SPECULATIVE_MARGIN},
    utils::allocator::{ShapeHandle, StaticHandle},
};

/// Sleep eligibility of a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyActivity {
    /// Squared velocity (linear plus angular) under which the body counts as calm.
    /// Negative disables sleeping.
    pub sleep_threshold: f32,
    /// Calm steps in a row before the body may be put to sleep.
    pub minimum_timesteps_under_threshold: u32,
}

impl BodyActivity {
    pub fn new(sleep_threshold: f32) -> Self {
        Self {
            sleep_threshold,
            minimum_timesteps_under_threshold: DEFAULT_MINIMUM_SLEEP_TIMESTEPS,
        }
    }

    pub fn never_sleep() -> Self {
        Self::new(-1.0)
    }

    pub fn allows_sleep(&self) -> bool {
        self.sleep_threshold >= 0.0
    }
}

impl Default for BodyActivity {
    fn default() -> Self {
        Self::new(0.01)
    }
}

/// Everything needed to add a body to a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDescription {
    pub pose: Pose,
    pub velocity: Velocity,
    pub inertia: BodyInertia,
    pub shape: ShapeHandle,
    pub speculative_margin: f32,
    pub activity: BodyActivity,
}

impl BodyDescription {
    pub fn dynamic(
        pose: Pose,
        inertia: BodyInertia,
        shape: ShapeHandle,
        activity: BodyActivity,
    ) -> Self {
        Self {
            pose,
            velocity: Velocity::default(),
            inertia,
            shape,
            speculative_margin: DEFAULT_SPECULATIVE_MARGIN,
            activity,
        }
    }

    /// Infinite-mass body that moves only by the velocity it is given.
    pub fn kinematic(
        pose: Pose,
        velocity: Velocity,
        shape: ShapeHandle,
        activity: BodyActivity,
    ) -> Self {
        Self {
            pose,
            velocity,
            inertia: BodyInertia::kinematic(),
            shape,
            speculative_margin: DEFAULT_SPECULATIVE_MARGIN,
            activity,
        }
    }

    pub fn with_speculative_margin(mut self, margin: f32) -> Self {
        self.speculative_margin = margin.max(0.0);
        self
    }

    pub fn with_velocity(mut self, velocity: Velocity) -> Self {
        self.velocity = velocity;
        self
    }
}

/// An immovable collidable such as the floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticDescription {
    pub pose: Pose,
    pub shape: ShapeHandle,
}

impl StaticDescription {
    pub fn new(pose: Pose, shape: ShapeHandle) -> Self {
        Self { pose, shape }
    }
}

/// Where a body's record currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyLocation {
    Active { index: usize },
    Sleeping { set: usize, slot: usize },
}

/// Stored state of a live body.
#[derive(Debug, Clone)]
pub(crate) struct BodyRecord {
    pub pose: Pose,
    pub velocity: Velocity,
    pub inertia: BodyInertia,
    pub shape: ShapeHandle,
    pub speculative_margin: f32,
    pub activity: BodyActivity,
    pub calm_steps: u32,
    pub location: BodyLocation,
}

impl BodyRecord {
    pub fn from_description(description: &BodyDescription, location: BodyLocation) -> Self {
        Self {
            pose: description.pose,
            velocity: description.velocity,
            inertia: description.inertia,
            shape: description.shape,
            speculative_margin: description.speculative_margin,
            activity: description.activity,
            calm_steps: 0,
            location,
        }
    }

    pub fn is_kinematic(&self) -> bool {
        self.inertia.is_kinematic()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.location, BodyLocation::Active { .. })
    }

    /// Counts calm steps using the squared velocity heuristic.
    pub fn update_sleep_candidacy(&mut self) {
        let heuristic = self.velocity.squared_magnitude();
        if !self.activity.allows_sleep() || heuristic > self.activity.sleep_threshold {
            self.calm_steps = 0;
        } else {
            self.calm_steps = self.calm_steps.saturating_add(1);
        }
    }

    pub fn is_sleep_candidate(&self) -> bool {
        self.activity.allows_sleep()
            && self.calm_steps >= self.activity.minimum_timesteps_under_threshold
    }
}

/// Stored state of a static.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StaticRecord {
    pub pose: Pose,
    pub shape: ShapeHandle,
    pub handle: StaticHandle,
}
