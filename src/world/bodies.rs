use crate::{
    core::body::{BodyDescription, BodyLocation, BodyRecord},
    core::types::Velocity,
    error::{HandleRef, PhysicsError, Result, StorageKind},
    utils::allocator::{Arena, BodyHandle},
};

/// Bodies that went to sleep together. Removed members leave a tombstone behind.
#[derive(Debug, Default)]
pub(crate) struct SleepingSet {
    pub members: Vec<Option<BodyHandle>>,
    pub tombstones: usize,
}

/// Body storage split into a dense active list and pooled sleeping sets.
pub(crate) struct BodySet {
    records: Arena<BodyRecord>,
    active: Vec<BodyHandle>,
    sleeping: Vec<Option<SleepingSet>>,
    free_sleeping_slots: Vec<usize>,
}

impl BodySet {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            records: Arena::with_limit(capacity),
            active: Vec::new(),
            sleeping: Vec::new(),
            free_sleeping_slots: Vec::new(),
        }
    }

    pub fn remaining_capacity(&self) -> Option<usize> {
        self.records.remaining_capacity()
    }

    pub fn add(&mut self, description: &BodyDescription) -> Result<BodyHandle> {
        let location = BodyLocation::Active {
            index: self.active.len(),
        };
        let record = BodyRecord::from_description(description, location);
        let id = self.records.try_insert(record).map_err(|_| {
            PhysicsError::ShapeAllocationExhausted {
                kind: StorageKind::Bodies,
                requested: 1,
                available: 0,
            }
        })?;
        let handle = BodyHandle(id);
        self.active.push(handle);
        Ok(handle)
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Result<()> {
        let record = self
            .records
            .remove(handle.0)
            .ok_or(PhysicsError::InvalidHandle(HandleRef::Body(handle)))?;
        match record.location {
            BodyLocation::Active { index } => self.detach_active(index),
            BodyLocation::Sleeping { set, slot } => {
                if let Some(sleeping) = self.sleeping.get_mut(set).and_then(Option::as_mut) {
                    sleeping.members[slot] = None;
                    sleeping.tombstones += 1;
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, handle: BodyHandle) -> Result<&BodyRecord> {
        self.records
            .get(handle.0)
            .ok_or(PhysicsError::InvalidHandle(HandleRef::Body(handle)))
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Result<&mut BodyRecord> {
        self.records
            .get_mut(handle.0)
            .ok_or(PhysicsError::InvalidHandle(HandleRef::Body(handle)))
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.records.contains(handle.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn active(&self) -> &[BodyHandle] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Slots held by sleeping sets, tombstones of removed bodies included.
    pub fn sleeping_count(&self) -> usize {
        self.sleeping
            .iter()
            .flatten()
            .map(|set| set.members.len())
            .sum()
    }

    pub fn live_sleeping_count(&self) -> usize {
        self.sleeping
            .iter()
            .flatten()
            .map(|set| set.members.len() - set.tombstones)
            .sum()
    }

    /// Live sleeping bodies in set order.
    pub fn sleeping_members(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.sleeping
            .iter()
            .flatten()
            .flat_map(|set| set.members.iter().flatten().copied())
    }

    pub fn sleeping_set_of(&self, handle: BodyHandle) -> Option<usize> {
        match self.records.get(handle.0)?.location {
            BodyLocation::Sleeping { set, .. } => Some(set),
            BodyLocation::Active { .. } => None,
        }
    }

    /// Records of every active body, for handing out to workers.
    pub fn active_records_mut(&mut self) -> Vec<&mut BodyRecord> {
        self.records
            .iter_mut()
            .map(|(_, record)| record)
            .filter(|record| record.is_active())
            .collect()
    }

    /// Drops sets that lost members since the last step and wakes their survivors,
    /// which may have been resting on a removed body. Returns the tombstones dropped.
    pub fn reclaim_tombstones(&mut self) -> usize {
        let damaged: Vec<usize> = self
            .sleeping
            .iter()
            .enumerate()
            .filter_map(|(index, set)| {
                set.as_ref()
                    .filter(|set| set.tombstones > 0)
                    .map(|_| index)
            })
            .collect();

        let mut reclaimed = 0;
        for index in damaged {
            if let Some(set) = self.sleeping.get(index).and_then(Option::as_ref) {
                reclaimed += set.tombstones;
            }
            self.awaken_set(index);
        }
        if reclaimed > 0 {
            log::debug!("reclaimed {reclaimed} sleeping slots");
        }
        reclaimed
    }

    /// Moves every member of a sleeping set back to the active list.
    pub fn awaken_set(&mut self, set_index: usize) -> usize {
        let Some(set) = self.sleeping.get_mut(set_index).and_then(Option::take) else {
            return 0;
        };
        self.free_sleeping_slots.push(set_index);

        let mut woken = 0;
        for handle in set.members.into_iter().flatten() {
            let index = self.active.len();
            if let Some(record) = self.records.get_mut(handle.0) {
                record.location = BodyLocation::Active { index };
                record.calm_steps = 0;
                self.active.push(handle);
                woken += 1;
            }
        }
        woken
    }

    /// Moves a group of active bodies into a fresh sleeping set.
    pub fn sleep(&mut self, handles: &[BodyHandle]) {
        let set_index = match self.free_sleeping_slots.pop() {
            Some(index) => index,
            None => {
                self.sleeping.push(None);
                self.sleeping.len() - 1
            }
        };

        let mut set = SleepingSet::default();
        for &handle in handles {
            let Some(BodyLocation::Active { index }) =
                self.records.get(handle.0).map(|record| record.location)
            else {
                continue;
            };
            self.detach_active(index);
            if let Some(record) = self.records.get_mut(handle.0) {
                record.location = BodyLocation::Sleeping {
                    set: set_index,
                    slot: set.members.len(),
                };
                record.velocity = Velocity::default();
            }
            set.members.push(Some(handle));
        }
        self.sleeping[set_index] = Some(set);
    }

    fn detach_active(&mut self, index: usize) {
        self.active.swap_remove(index);
        if let Some(&moved) = self.active.get(index) {
            if let Some(record) = self.records.get_mut(moved.0) {
                record.location = BodyLocation::Active { index };
            }
        }
    }
}
