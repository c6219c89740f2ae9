//! Fixed Step Physics – a fixed-timestep rigid-body sandbox core.
//!
//! A [`Simulation`] owns shapes, bodies and statics and advances them one
//! fixed step at a time. The [`FixedStepScheduler`] decides how many steps a
//! presentation frame needs, the [`BodyLifecycleManager`] spawns and removes
//! bodies between frames, and the [`ContactPolicy`] and [`GravityIntegrator`]
//! callbacks steer contacts and velocity integration from worker threads.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod lifecycle;
pub mod sandbox;
pub mod scheduler;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Mat4, Quat, Vec3};

pub use collision::{
    allow_contact_generation, ContactManifold, ContactPolicy, NarrowPhaseCallbacks,
    PairMaterialProperties,
};
pub use config::{SimulationSettings, SolverConfig};
pub use crate::core::{
    BodyActivity, BodyDescription, BodyInertia, CollidableMobility, CollidablePair,
    CollidableReference, Pose, Shape, ShapeKind, StaticDescription, Velocity,
};
pub use dynamics::{
    AngularIntegrationMode, GravityIntegrator, PoseIntegratorCallbacks, SpringSettings,
};
pub use error::{HandleRef, PhysicsError, Result, StorageKind};
pub use lifecycle::{BodyLifecycleManager, RenderInstance};
pub use sandbox::{Diagnostics, Sandbox, SandboxSettings, UiEvent};
pub use scheduler::{FixedStepScheduler, FrameReport};
pub use utils::allocator::{BodyHandle, ShapeHandle, StaticHandle};
pub use utils::dispatcher::WorkerPool;
pub use world::{Simulation, StepStats};
