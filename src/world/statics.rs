use crate::{
    core::body::{StaticDescription, StaticRecord},
    error::{HandleRef, PhysicsError, Result, StorageKind},
    utils::allocator::{Arena, GenerationalId, StaticHandle},
};

/// Immovable collidables. Statics live as long as the simulation.
pub(crate) struct StaticSet {
    records: Arena<StaticRecord>,
}

impl StaticSet {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            records: Arena::with_limit(capacity),
        }
    }

    pub fn add(&mut self, description: &StaticDescription) -> Result<StaticHandle> {
        // The handle is only known once the slot is taken.
        let placeholder = StaticRecord {
            pose: description.pose,
            shape: description.shape,
            handle: StaticHandle(GenerationalId::new(0, 0)),
        };
        let id = self.records.try_insert(placeholder).map_err(|_| {
            PhysicsError::ShapeAllocationExhausted {
                kind: StorageKind::Statics,
                requested: 1,
                available: 0,
            }
        })?;
        let handle = StaticHandle(id);
        if let Some(record) = self.records.get_mut(id) {
            record.handle = handle;
        }
        Ok(handle)
    }

    pub fn get(&self, handle: StaticHandle) -> Result<&StaticRecord> {
        self.records
            .get(handle.0)
            .ok_or(PhysicsError::InvalidHandle(HandleRef::Static(handle)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StaticRecord> + '_ {
        self.records.iter().map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
