//! Global configuration constants and runtime solver settings.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -10.0, 0.0];

/// Default number of fixed steps per simulated second.
pub const DEFAULT_SIMULATION_RATE: f32 = 60.0;

/// Velocity iterations used by the interactive (windowed) sandbox.
pub const WINDOWED_VELOCITY_ITERATIONS: u32 = 2;

/// Velocity iterations used when running without a presentation layer.
pub const HEADLESS_VELOCITY_ITERATIONS: u32 = 8;

/// Default number of solver substeps per fixed step.
pub const DEFAULT_SUBSTEPS: u32 = 1;

/// Slider range for velocity iterations and substeps.
pub const ITERATION_RANGE: (u32, u32) = (1, 8);

/// Slider range for the simulation rate.
pub const SIMULATION_RATE_RANGE: (f32, f32) = (24.0, 90.0);

/// Distance beyond contact at which manifolds start being generated.
pub const DEFAULT_SPECULATIVE_MARGIN: f32 = 0.1;

/// Consecutive calm steps before a body becomes a sleep candidate.
pub const DEFAULT_MINIMUM_SLEEP_TIMESTEPS: u32 = 32;

/// Default cell size for the broad-phase uniform grid.
pub const DEFAULT_BROADPHASE_CELL_SIZE: f32 = 1.0;

/// Uniform pair material: friction coefficient.
pub const DEFAULT_FRICTION_COEFFICIENT: f32 = 1.0;

/// Uniform pair material: maximum penetration recovery speed.
pub const DEFAULT_MAXIMUM_RECOVERY_VELOCITY: f32 = 2.0;

/// Uniform pair material: contact spring frequency.
pub const DEFAULT_CONTACT_SPRING_FREQUENCY: f32 = 30.0;

/// Uniform pair material: contact spring damping ratio.
pub const DEFAULT_CONTACT_SPRING_DAMPING_RATIO: f32 = 1.0;

/// Runtime solver knobs. Changes apply from the next step onwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    velocity_iteration_count: u32,
    substep_count: u32,
    simulation_rate: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::windowed()
    }
}

impl SolverConfig {
    pub fn new(velocity_iteration_count: u32, substep_count: u32, simulation_rate: f32) -> Result<Self> {
        let mut config = Self::windowed();
        config.set_velocity_iteration_count(velocity_iteration_count)?;
        config.set_substep_count(substep_count)?;
        config.set_simulation_rate(simulation_rate)?;
        Ok(config)
    }

    /// Settings used by the interactive sandbox.
    pub fn windowed() -> Self {
        Self {
            velocity_iteration_count: WINDOWED_VELOCITY_ITERATIONS,
            substep_count: DEFAULT_SUBSTEPS,
            simulation_rate: DEFAULT_SIMULATION_RATE,
        }
    }

    /// Settings used for headless runs, which can afford more iterations.
    pub fn headless() -> Self {
        Self {
            velocity_iteration_count: HEADLESS_VELOCITY_ITERATIONS,
            ..Self::windowed()
        }
    }

    pub fn velocity_iteration_count(&self) -> u32 {
        self.velocity_iteration_count
    }

    pub fn substep_count(&self) -> u32 {
        self.substep_count
    }

    pub fn simulation_rate(&self) -> f32 {
        self.simulation_rate
    }

    /// Duration of one fixed step in seconds.
    pub fn fixed_step(&self) -> f32 {
        1.0 / self.simulation_rate
    }

    pub fn set_velocity_iteration_count(&mut self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(PhysicsError::InvalidConfig(
                "velocity iteration count must be at least 1".to_string(),
            ));
        }
        self.velocity_iteration_count = count;
        Ok(())
    }

    pub fn set_substep_count(&mut self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(PhysicsError::InvalidConfig(
                "substep count must be at least 1".to_string(),
            ));
        }
        self.substep_count = count;
        Ok(())
    }

    pub fn set_simulation_rate(&mut self, rate: f32) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "simulation rate must be positive, got {rate}"
            )));
        }
        self.simulation_rate = rate;
        Ok(())
    }

    /// Rejects values that bypassed the setters (e.g. deserialized ones).
    pub fn validate(&self) -> Result<()> {
        Self::new(
            self.velocity_iteration_count,
            self.substep_count,
            self.simulation_rate,
        )
        .map(|_| ())
    }
}

/// Construction-time settings of a [`crate::Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub gravity: Vec3,
    pub solver: SolverConfig,
    pub broadphase_cell_size: f32,
    /// `None` leaves the pool unbounded.
    pub body_capacity: Option<usize>,
    pub shape_capacity: Option<usize>,
    pub static_capacity: Option<usize>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            solver: SolverConfig::windowed(),
            broadphase_cell_size: DEFAULT_BROADPHASE_CELL_SIZE,
            body_capacity: None,
            shape_capacity: None,
            static_capacity: None,
        }
    }
}

impl SimulationSettings {
    pub fn headless() -> Self {
        Self {
            solver: SolverConfig::headless(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windowed_and_headless_differ_only_in_iterations() {
        let windowed = SolverConfig::windowed();
        let headless = SolverConfig::headless();
        assert_eq!(windowed.velocity_iteration_count(), 2);
        assert_eq!(headless.velocity_iteration_count(), 8);
        assert_eq!(windowed.substep_count(), headless.substep_count());
        assert_eq!(windowed.simulation_rate(), headless.simulation_rate());
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let mut config = SolverConfig::windowed();
        assert!(config.set_velocity_iteration_count(0).is_err());
        assert!(config.set_substep_count(0).is_err());
        assert!(config.set_simulation_rate(0.0).is_err());
        assert!(config.set_simulation_rate(f32::NAN).is_err());
        assert_eq!(config, SolverConfig::windowed());
    }

    #[test]
    fn fixed_step_tracks_rate() {
        let mut config = SolverConfig::windowed();
        config.set_simulation_rate(90.0).unwrap();
        assert!((config.fixed_step() - 1.0 / 90.0).abs() < 1e-7);
    }
}
