use serde::{Deserialize, Serialize};

use crate::utils::allocator::{BodyHandle, StaticHandle};

/// How a collidable can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollidableMobility {
    /// Owned by a body with finite mass.
    Dynamic,
    /// Owned by a body with infinite mass that still moves by its velocity.
    Kinematic,
    /// Immovable, owned by a static.
    Static,
}

/// Refers to whichever body or static owns a collidable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollidableReference {
    Dynamic(BodyHandle),
    Kinematic(BodyHandle),
    Static(StaticHandle),
}

impl CollidableReference {
    pub fn mobility(&self) -> CollidableMobility {
        match self {
            Self::Dynamic(_) => CollidableMobility::Dynamic,
            Self::Kinematic(_) => CollidableMobility::Kinematic,
            Self::Static(_) => CollidableMobility::Static,
        }
    }

    pub fn body_handle(&self) -> Option<BodyHandle> {
        match self {
            Self::Dynamic(handle) | Self::Kinematic(handle) => Some(*handle),
            Self::Static(_) => None,
        }
    }

    pub fn static_handle(&self) -> Option<StaticHandle> {
        match self {
            Self::Static(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// Two collidables considered for contact during a single step. Never stored across steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollidablePair {
    pub a: CollidableReference,
    pub b: CollidableReference,
}

impl CollidablePair {
    pub fn new(a: CollidableReference, b: CollidableReference) -> Self {
        Self { a, b }
    }
}
