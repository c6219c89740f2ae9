use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Slot index plus the generation the slot had when the id was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub(crate) GenerationalId);

        impl $name {
            pub fn index(&self) -> usize {
                self.0.index
            }

            pub fn generation(&self) -> u32 {
                self.0.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}<{}:{}>", $label, self.0.index, self.0.generation)
            }
        }
    };
}

typed_handle!(
    /// Dynamic or kinematic body. Retired for good once removed, even if its slot is reused.
    BodyHandle,
    "BodyHandle"
);
typed_handle!(
    /// Immovable collidable.
    StaticHandle,
    "StaticHandle"
);
typed_handle!(
    /// Immutable shape description shared by any number of bodies.
    ShapeHandle,
    "ShapeHandle"
);

/// Generational arena that hands out stable ids while preventing use-after-free.
///
/// Removed slots are pooled and reused; the generation bump makes sure ids
/// issued for the previous occupant never resolve again. A slot that has run
/// through every generation is never reused.
pub struct Arena<T> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
    live: usize,
    limit: Option<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            live: 0,
            limit: None,
        }
    }

    /// Arena that refuses to hold more than `limit` live items.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::new()
        }
    }

    /// Number of further inserts that will succeed, `None` when unbounded.
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.live))
    }

    /// Inserts `item`, handing it back if the arena is full.
    pub fn try_insert(&mut self, item: T) -> Result<GenerationalId, T> {
        if self.remaining_capacity() == Some(0) {
            return Err(item);
        }
        self.live += 1;

        if let Some(index) = self.free_list.pop_front() {
            let generation = self.generations[index];
            self.items[index] = Some(item);
            return Ok(GenerationalId::new(index, generation));
        }

        let index = self.items.len();
        self.items.push(Some(item));
        self.generations.push(0);
        Ok(GenerationalId::new(index, 0))
    }

    pub fn get(&self, id: GenerationalId) -> Option<&T> {
        if self.is_valid(id) {
            self.items.get(id.index).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: GenerationalId) -> Option<&mut T> {
        if self.is_valid(id) {
            self.items.get_mut(id.index).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn remove(&mut self, id: GenerationalId) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let item = self.items.get_mut(id.index).and_then(|slot| slot.take())?;
        self.live -= 1;
        // A slot whose generation is spent is retired instead of wrapping back to old ids.
        match self.generations[id.index].checked_add(1) {
            Some(next) => {
                self.generations[id.index] = next;
                self.free_list.push_back(id.index);
            }
            None => log::debug!("retiring slot {} after exhausting its generations", id.index),
        }
        Some(item)
    }

    pub fn contains(&self, id: GenerationalId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GenerationalId, &T)> + '_ {
        self.items.iter().enumerate().filter_map(move |(index, slot)| {
            slot.as_ref()
                .map(|item| (GenerationalId::new(index, self.generations[index]), item))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (GenerationalId, &mut T)> + '_ {
        let generations = &self.generations;
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_mut()
                    .map(|item| (GenerationalId::new(index, generations[index]), item))
            })
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn is_valid(&self, id: GenerationalId) -> bool {
        self.generations
            .get(id.index)
            .copied()
            .map(|gen| gen == id.generation)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_ids_stay_dead_after_slot_reuse() {
        let mut arena = Arena::new();
        let first = arena.try_insert("a").unwrap();
        arena.remove(first);
        let second = arena.try_insert("b").unwrap();

        assert_eq!(first.index, second.index);
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"b"));
    }

    #[test]
    fn limit_rejects_inserts_until_space_frees_up() {
        let mut arena = Arena::with_limit(Some(1));
        let id = arena.try_insert(1).unwrap();
        assert_eq!(arena.try_insert(2), Err(2));
        assert_eq!(arena.remaining_capacity(), Some(0));

        arena.remove(id);
        assert!(arena.try_insert(3).is_ok());
    }

    #[test]
    fn exhausted_slot_is_retired() {
        let mut arena = Arena::new();
        arena.try_insert('a').unwrap();
        arena.generations[0] = u32::MAX - 1;
        let penultimate = GenerationalId::new(0, u32::MAX - 1);
        assert_eq!(arena.remove(penultimate), Some('a'));

        let last = arena.try_insert('b').unwrap();
        assert_eq!(last, GenerationalId::new(0, u32::MAX));
        assert_eq!(arena.remove(last), Some('b'));

        let fresh = arena.try_insert('c').unwrap();
        assert_eq!(fresh.index, 1);
        assert!(arena.get(last).is_none());
        assert!(arena.get(GenerationalId::new(0, 0)).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn double_remove_is_rejected() {
        let mut arena = Arena::new();
        let id = arena.try_insert(7).unwrap();
        assert_eq!(arena.remove(id), Some(7));
        assert_eq!(arena.remove(id), None);
        assert_eq!(arena.len(), 0);
    }
}
