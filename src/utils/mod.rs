//! Utility helpers: generational storage, worker dispatch, logging timers, and math extensions.

pub mod allocator;
pub mod dispatcher;
pub mod logging;
pub mod math;
pub mod profiling;

pub use allocator::{Arena, BodyHandle, GenerationalId, ShapeHandle, StaticHandle};
pub use dispatcher::{WorkerLoad, WorkerPool};
pub use math::*;
pub use profiling::StepProfile;
