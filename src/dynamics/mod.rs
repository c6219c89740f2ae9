//! Simulation dynamics: gravity integration, pose integration, soft contacts and sleeping.

pub mod integrator;
pub mod island;
pub mod solver;
pub mod spring;

pub use integrator::{
    integrate_pose, AngularIntegrationMode, GravityIntegrator, PoseIntegratorCallbacks,
};
pub use island::IslandSleeper;
pub use solver::{ContactConstraint, ContactSolver, SolverBody};
pub use spring::{SpringSettings, Springiness};
