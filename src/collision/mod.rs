//! Collision detection: broad phase, primitive narrow phase, contact manifolds and the contact policy.

pub mod broadphase;
pub mod clipping;
pub mod contact;
pub mod narrowphase;
pub mod policy;

pub use broadphase::{BroadPhase, BroadPhaseProxy, CandidatePairs, SpatialGrid};
pub use contact::{ContactManifold, ContactPoint};
pub use narrowphase::collide;
pub use policy::{
    allow_contact_generation, ContactPolicy, NarrowPhaseCallbacks, PairMaterialProperties,
};
