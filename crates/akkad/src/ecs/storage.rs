//! # Storage: Per-Type Sparse Sets
//!
//! Every component type gets its own [`SparseSet`]. A sparse set is two arrays
//! that point at each other:
//!
//! ```text
//! sparse: [None, Some(1), None, Some(0)]   ← indexed by Entity::index
//!                  │               │
//! dense:  [ C(e3), C(e1) ]  ◄──────┘        ← packed component values
//! owners: [  e3,    e1   ]                  ← full handle per dense slot
//! ```
//!
//! Lookup is two array reads, iteration walks the packed `dense` array, and
//! removal is a `swap_remove` plus one sparse fix-up. `owners` stores the full
//! generational handle so a lookup with a stale handle for a recycled index
//! misses instead of returning the new occupant's data.
//!
//! The [`World`](super::world::World) holds storages behind the object-safe
//! [`ComponentStorage`] trait, keyed by [`TypeId`](std::any::TypeId), and
//! downcasts back to `SparseSet<T>` at the typed call sites.
//!
//! ## Comparison
//!
//! - **EnTT / shipyard**: sparse sets per component type, the same layout.
//! - **hecs / bevy_ecs (tables)**: archetype tables; faster multi-component
//!   iteration, slower add/remove.

use std::any::Any;

use super::entity::Entity;

/// Object-safe view of a component storage, used by the world for operations
/// that don't know the component type (despawn, presence checks, views).
pub trait ComponentStorage: Any + Send + Sync {
    /// Drop the component owned by `entity`, if any.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    fn contains(&self, entity: Entity) -> bool;

    fn len(&self) -> usize;

    /// Owners of the packed components, in dense order.
    fn owners(&self) -> &[Entity];

    fn type_name(&self) -> &'static str;

    fn clear(&mut self);

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Packed storage for one component type.
pub struct SparseSet<T> {
    sparse: Vec<Option<u32>>,
    dense: Vec<T>,
    owners: Vec<Entity>,
}

impl<T: 'static + Send + Sync> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            owners: Vec::new(),
        }
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        let dense = (*self.sparse.get(entity.index as usize)?)? as usize;
        (self.owners[dense] == entity).then_some(dense)
    }

    /// Insert or replace the component for `entity`. Returns the previous value.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let idx = entity.index as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        if let Some(dense) = self.sparse[idx] {
            let dense = dense as usize;
            // A stale owner for this index means the slot was recycled
            // without going through `remove`; overwrite it.
            self.owners[dense] = entity;
            return Some(std::mem::replace(&mut self.dense[dense], value));
        }
        self.sparse[idx] = Some(self.dense.len() as u32);
        self.dense.push(value);
        self.owners.push(entity);
        None
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense = self.slot(entity)?;
        self.sparse[entity.index as usize] = None;
        let value = self.dense.swap_remove(dense);
        self.owners.swap_remove(dense);
        if let Some(moved) = self.owners.get(dense) {
            self.sparse[moved.index as usize] = Some(dense as u32);
        }
        Some(value)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|dense| &self.dense[dense])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slot(entity).map(|dense| &mut self.dense[dense])
    }
}

impl<T: 'static + Send + Sync> ComponentStorage for SparseSet<T> {
    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn owners(&self) -> &[Entity] {
        &self.owners
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.owners.clear();
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
