//! Error types for the physics core.
//!
//! All fallible operations return [`PhysicsError`] through the [`Result`] alias.

use std::fmt;

use crate::utils::allocator::{BodyHandle, ShapeHandle, StaticHandle};

/// Identifies which kind of handle an operation was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleRef {
    Body(BodyHandle),
    Static(StaticHandle),
    Shape(ShapeHandle),
}

impl fmt::Display for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Body(handle) => write!(f, "{handle}"),
            Self::Static(handle) => write!(f, "{handle}"),
            Self::Shape(handle) => write!(f, "{handle}"),
        }
    }
}

/// Storage pools that can run out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Shapes,
    Bodies,
    Statics,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Shapes => write!(f, "shape"),
            Self::Bodies => write!(f, "body"),
            Self::Statics => write!(f, "static"),
        }
    }
}

/// Main error type for the physics core.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// The handle was never issued or has already been removed.
    InvalidHandle(HandleRef),
    /// Shape, body or static storage cannot grow any further.
    ShapeAllocationExhausted {
        kind: StorageKind,
        requested: usize,
        available: usize,
    },
    /// The worker pool could not be started.
    WorkerPoolUnavailable(String),
    /// A solver setting was zero, negative or not finite.
    InvalidConfig(String),
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidHandle(handle) => write!(f, "Invalid handle: {handle}"),
            Self::ShapeAllocationExhausted {
                kind,
                requested,
                available,
            } => write!(
                f,
                "{kind} storage exhausted: requested {requested}, {available} available"
            ),
            Self::WorkerPoolUnavailable(msg) => write!(f, "Worker pool unavailable: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for PhysicsError {}

/// Convenient Result type alias for physics operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_exhausted_pool() {
        let err = PhysicsError::ShapeAllocationExhausted {
            kind: StorageKind::Bodies,
            requested: 45,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "body storage exhausted: requested 45, 3 available"
        );
    }
}
