//! Core types describing bodies, statics, shapes, and collidable references.

pub mod body;
pub mod collidable;
pub mod shape;
pub mod types;

pub use body::{BodyActivity, BodyDescription, StaticDescription};
pub use collidable::{CollidableMobility, CollidablePair, CollidableReference};
pub use shape::{Aabb, Shape, ShapeKind};
pub use types::{BodyInertia, InertiaTensorExt, Pose, Velocity};
