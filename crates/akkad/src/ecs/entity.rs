//! # Entity: Generational Handles
//!
//! An [`Entity`] is an `(index, generation)` pair. It carries no data; the
//! [`World`](super::world::World) maps it to components held in per-type
//! storages.
//!
//! ## Generational Indices
//!
//! Slots are recycled when entities are destroyed. Each slot keeps a
//! generation counter that is bumped on release, so a handle saved before the
//! release no longer matches:
//!
//! ```text
//! Entity { index: 5, generation: 0 }  ← original
//! Entity { index: 5, generation: 1 }  ← after recycle
//! ```
//!
//! The allocator also tracks which slots are live.
//! [`EntityAllocator::entity_at`] turns a bare slot index back into a full
//! handle only when the slot is occupied.

use std::fmt;

/// A lightweight handle to an entity in the [`World`](super::world::World).
///
/// A handle is valid only while its generation matches the slot's current
/// generation and the slot is live.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// Returns the raw slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Manages entity slot allocation and recycling.
///
/// ```text
/// generations: [0, 1, 0, 2, 0]   ← one generation per slot ever allocated
/// live:        [T, F, T, F, T]   ← slot currently occupied
/// free_list:   [1, 3]            ← slots available for reuse
/// ```
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    live: Vec<bool>,
    free_list: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate a new [`Entity`], reusing a freed slot when one is available.
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped on release.
            self.live[index as usize] = true;
            Entity {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.live.push(true);
            Entity {
                index,
                generation: 0,
            }
        }
    }

    /// Release an entity's slot.
    ///
    /// Returns `false` if the handle was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let idx = entity.index as usize;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.live[idx] = false;
        self.free_list.push(entity.index);
        true
    }

    /// Check if an entity handle is still valid.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        idx < self.generations.len() && self.live[idx] && self.generations[idx] == entity.generation
    }

    /// Resolve a bare slot index to the live entity occupying it.
    pub fn entity_at(&self, index: u32) -> Option<Entity> {
        let idx = index as usize;
        if idx < self.live.len() && self.live[idx] {
            Some(Entity {
                index,
                generation: self.generations[idx],
            })
        } else {
            None
        }
    }

    /// Iterate all live entities in slot order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .map(|(idx, _)| Entity {
                index: idx as u32,
                generation: self.generations[idx],
            })
    }

    /// Returns the number of currently alive entities.
    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    /// Returns the number of free (recyclable) slots.
    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns the total number of slots ever allocated.
    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn total_slots(&self) -> usize {
        self.generations.len()
    }
}
