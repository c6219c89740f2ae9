use crate::{
    core::shape::Shape,
    error::{HandleRef, PhysicsError, Result, StorageKind},
    utils::allocator::{Arena, ShapeHandle},
};

/// Registered shapes. Shapes are never removed; bodies refer to them by handle.
pub(crate) struct ShapeSet {
    shapes: Arena<Shape>,
}

impl ShapeSet {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            shapes: Arena::with_limit(capacity),
        }
    }

    pub fn add(&mut self, shape: Shape) -> Result<ShapeHandle> {
        if !shape.is_valid() {
            return Err(PhysicsError::InvalidConfig(format!(
                "shape dimensions must be positive and finite: {shape:?}"
            )));
        }
        self.shapes
            .try_insert(shape)
            .map(ShapeHandle)
            .map_err(|_| PhysicsError::ShapeAllocationExhausted {
                kind: StorageKind::Shapes,
                requested: 1,
                available: 0,
            })
    }

    pub fn get(&self, handle: ShapeHandle) -> Result<&Shape> {
        self.shapes
            .get(handle.0)
            .ok_or(PhysicsError::InvalidHandle(HandleRef::Shape(handle)))
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }
}
