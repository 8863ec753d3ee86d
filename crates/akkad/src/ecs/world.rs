//! # World: The Central Container
//!
//! The [`World`] owns every entity and every component. It is the single
//! source of truth for scene state; the [`Scene`](crate::scene::Scene) wraps
//! it with the per-frame pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ World                                                │
//! │                                                      │
//! │  EntityAllocator: generations + live flags + freelist │
//! │                                                      │
//! │  storages: HashMap<TypeId, Box<dyn ComponentStorage>> │
//! │    one SparseSet<T> per component type               │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Destroying an entity removes it from every storage and bumps the slot
//! generation in the same call, so the handle is invalid everywhere at once.
//!
//! ## Lookups
//!
//! [`World::get`] / [`World::get_mut`] return `Option` for the common case.
//! [`World::component`] / [`World::component_mut`] return a [`Result`] that
//! tells a stale handle ([`AkkadError::InvalidEntity`]) apart from a missing
//! component ([`AkkadError::MissingComponent`]).

use std::any::TypeId;
use std::collections::HashMap;

use super::entity::{Entity, EntityAllocator};
use super::hierarchy::{self, RelationShip};
use super::query::{ComponentSet, QueryParam, Storages, View};
use super::storage::{ComponentStorage, SparseSet};
use crate::error::{AkkadError, Result};

/// The central container for all scene state.
pub struct World {
    allocator: EntityAllocator,
    storages: Storages,
    #[cfg(feature = "diagnostics")]
    spawned_this_frame: u32,
    #[cfg(feature = "diagnostics")]
    despawned_this_frame: u32,
}

impl World {
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            storages: HashMap::new(),
            #[cfg(feature = "diagnostics")]
            spawned_this_frame: 0,
            #[cfg(feature = "diagnostics")]
            despawned_this_frame: 0,
        }
    }

    // ── Entity Management ────────────────────────────────────────────

    /// Returns the number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Check if an entity is alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Resolve a bare slot index (as stored in the picking buffer) to the live
    /// entity occupying it.
    pub fn entity_at(&self, index: u32) -> Option<Entity> {
        self.allocator.entity_at(index)
    }

    /// Snapshot of all alive entities, in slot order.
    pub fn entities(&self) -> Vec<Entity> {
        self.allocator.iter_alive().collect()
    }

    /// Returns every entity that has a component of type `T`.
    pub fn entities_with<T: 'static + Send + Sync>(&self) -> Vec<Entity> {
        self.storages
            .get(&TypeId::of::<T>())
            .map(|s| s.owners().to_vec())
            .unwrap_or_default()
    }

    // ── Spawn / Despawn ──────────────────────────────────────────────

    /// Spawn an entity with no components.
    pub fn spawn_empty(&mut self) -> Entity {
        #[cfg(feature = "diagnostics")]
        {
            self.spawned_this_frame += 1;
        }
        self.allocator.allocate()
    }

    /// Despawn an entity: drop all of its components and free its slot.
    ///
    /// An entity with a [`RelationShip`] is first taken out of its tree: its
    /// siblings are relinked and its children become roots, so no link left
    /// in the world names the freed slot.
    ///
    /// Returns `true` if the entity was alive.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            return false;
        }
        if self.has::<RelationShip>(entity) {
            if let Err(err) = hierarchy::remove_from_hierarchy(self, entity) {
                log::warn!("unlinking {entity:?} before despawn: {err}");
            }
        }
        self.free_slot(entity);
        true
    }

    fn free_slot(&mut self, entity: Entity) {
        for storage in self.storages.values_mut() {
            storage.remove_entity(entity);
        }
        self.allocator.deallocate(entity);
        #[cfg(feature = "diagnostics")]
        {
            self.despawned_this_frame += 1;
        }
    }

    /// Despawn every entity in the world. No links survive, so none are
    /// unlinked one by one.
    pub fn despawn_all(&mut self) {
        for entity in self.entities() {
            self.free_slot(entity);
        }
        for storage in self.storages.values_mut() {
            storage.clear();
        }
    }

    // ── Per-Entity Component Access ──────────────────────────────────

    fn set<T: 'static + Send + Sync>(&self) -> Option<&SparseSet<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<SparseSet<T>>())
    }

    fn set_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut SparseSet<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<SparseSet<T>>())
    }

    /// Get a shared reference to a component on a specific entity.
    ///
    /// Returns `None` if the entity is dead or doesn't have the component.
    pub fn get<T: 'static + Send + Sync>(&self, entity: Entity) -> Option<&T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.set::<T>()?.get(entity)
    }

    /// Get a mutable reference to a component on a specific entity.
    pub fn get_mut<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.set_mut::<T>()?.get_mut(entity)
    }

    /// Returns `true` if the entity is alive and has a `T`.
    pub fn has<T: 'static + Send + Sync>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Like [`get`](Self::get), but reports why the lookup failed.
    pub fn component<T: 'static + Send + Sync>(&self, entity: Entity) -> Result<&T> {
        if !self.allocator.is_alive(entity) {
            return Err(AkkadError::InvalidEntity(entity));
        }
        self.set::<T>()
            .and_then(|s| s.get(entity))
            .ok_or_else(|| AkkadError::missing::<T>(entity))
    }

    /// Like [`get_mut`](Self::get_mut), but reports why the lookup failed.
    pub fn component_mut<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Result<&mut T> {
        if !self.allocator.is_alive(entity) {
            return Err(AkkadError::InvalidEntity(entity));
        }
        self.set_mut::<T>()
            .and_then(|s| s.get_mut(entity))
            .ok_or_else(|| AkkadError::missing::<T>(entity))
    }

    // ── Dynamic Component Add/Remove ─────────────────────────────────

    /// Add a component to an existing entity, replacing any previous value of
    /// the same type.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn insert<T: 'static + Send + Sync>(&mut self, entity: Entity, component: T) {
        assert!(
            self.allocator.is_alive(entity),
            "Cannot insert component `{}` on dead entity {:?}",
            std::any::type_name::<T>(),
            entity
        );
        self.storage_for::<T>().insert(entity, component);
    }

    /// Fallible [`insert`](Self::insert) for handles that may be stale.
    pub fn try_insert<T: 'static + Send + Sync>(&mut self, entity: Entity, component: T) -> Result<()> {
        if !self.allocator.is_alive(entity) {
            return Err(AkkadError::InvalidEntity(entity));
        }
        self.storage_for::<T>().insert(entity, component);
        Ok(())
    }

    /// Remove a component from an entity, returning it.
    ///
    /// Returns `None` if the entity is dead or didn't have the component.
    pub fn remove<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Option<T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.set_mut::<T>()?.remove(entity)
    }

    fn storage_for<T: 'static + Send + Sync>(&mut self) -> &mut SparseSet<T> {
        self.storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()))
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .unwrap_or_else(|| {
                panic!(
                    "Storage type mismatch for `{}`",
                    std::any::type_name::<T>()
                )
            })
    }

    // ── Type-Erased Access ───────────────────────────────────────────

    pub(crate) fn storage_contains(&self, type_id: TypeId, entity: Entity) -> bool {
        self.storages
            .get(&type_id)
            .is_some_and(|s| s.contains(entity))
    }

    /// Owner list of the smallest storage among `type_ids`, or `None` if any
    /// of them has no storage yet.
    pub(crate) fn smallest_owner_list(&self, type_ids: &[TypeId]) -> Option<&[Entity]> {
        let mut smallest: Option<&dyn ComponentStorage> = None;
        for tid in type_ids {
            let storage = self.storages.get(tid)?;
            if smallest.is_none_or(|s| storage.len() < s.len()) {
                smallest = Some(storage.as_ref());
            }
        }
        smallest.map(|s| s.owners())
    }

    /// Short names of every component type attached to `entity`.
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .storages
            .values()
            .filter(|s| s.contains(entity))
            .map(|s| crate::error::short_type_name(s.type_name()))
            .collect();
        names.sort_unstable();
        names
    }

    // ── Query ────────────────────────────────────────────────────────

    /// Query all entities that have the requested component types.
    ///
    /// # Example
    ///
    /// ```ignore
    /// world.query::<(&mut Transform, &RigidBody2d)>(|entity, (tf, body)| {
    ///     tf.translation.y -= 1.0;
    /// });
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the same component type appears twice in `Q`.
    pub fn query<Q: QueryParam>(&mut self, f: impl FnMut(Entity, Q::Item<'_>)) {
        self.query_with::<Q>(Q::type_ids(), f);
    }

    /// Query with an additional filter: only entities that also have a marker
    /// component `F`. The filter component is not yielded.
    pub fn query_filtered<Q: QueryParam, F: 'static + Send + Sync>(
        &mut self,
        f: impl FnMut(Entity, Q::Item<'_>),
    ) {
        let mut required = Q::type_ids();
        required.push(TypeId::of::<F>());
        self.query_with::<Q>(required, f);
    }

    fn query_with<Q: QueryParam>(&mut self, required: Vec<TypeId>, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        let fetched = Q::type_ids();
        for (i, tid) in fetched.iter().enumerate() {
            assert!(
                !fetched[..i].contains(tid),
                "query: component type requested twice in `{}`",
                std::any::type_name::<Q>()
            );
        }

        // Snapshot the driver before extraction so the storages can move.
        let Some(driver) = self.smallest_owner_list(&required).map(|d| d.to_vec()) else {
            return;
        };
        let filters: Vec<TypeId> = required
            .into_iter()
            .filter(|tid| !fetched.contains(tid))
            .collect();

        let mut cols = Q::extract(&mut self.storages);
        for entity in driver {
            if !Q::contains(&cols, entity) {
                continue;
            }
            if !filters.iter().all(|tid| self.storage_contains(*tid, entity)) {
                continue;
            }
            f(entity, Q::fetch(&mut cols, entity));
        }
        Q::restore(cols, &mut self.storages);
    }

    /// A lazy, restartable view over entities holding every type in `S`.
    pub fn view<S: ComponentSet>(&self) -> View<'_, S> {
        View::new(self)
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// Collect entity pool statistics and reset per-frame counters.
    #[cfg(feature = "diagnostics")]
    pub(crate) fn take_entity_stats(&mut self) -> crate::diag::EntityPoolStats {
        let stats = crate::diag::EntityPoolStats {
            total_slots: self.allocator.total_slots(),
            free_count: self.allocator.free_count(),
            alive_count: self.allocator.alive_count(),
            storage_count: self.storages.len(),
            spawned_this_frame: self.spawned_this_frame,
            despawned_this_frame: self.despawned_this_frame,
        };
        self.spawned_this_frame = 0;
        self.despawned_this_frame = 0;
        stats
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ── Spawn Trait (tuple support) ──────────────────────────────────────────

/// Trait for component bundles that can be spawned into the world.
///
/// Implemented for tuples of up to 8 components.
pub trait SpawnBundle {
    /// Insert every component of the bundle on `entity`.
    fn insert_into(self, world: &mut World, entity: Entity);
}

macro_rules! impl_spawn_bundle {
    ($($T:ident),+) => {
        impl<$($T: 'static + Send + Sync),+> SpawnBundle for ($($T,)+) {
            #[allow(non_snake_case)]
            fn insert_into(self, world: &mut World, entity: Entity) {
                let ($($T,)+) = self;
                $(world.insert(entity, $T);)+
            }
        }
    };
}

impl_spawn_bundle!(A);
impl_spawn_bundle!(A, B);
impl_spawn_bundle!(A, B, C);
impl_spawn_bundle!(A, B, C, D);
impl_spawn_bundle!(A, B, C, D, E);
impl_spawn_bundle!(A, B, C, D, E, F);
impl_spawn_bundle!(A, B, C, D, E, F, G);
impl_spawn_bundle!(A, B, C, D, E, F, G, H);

impl World {
    /// Spawn an entity with a bundle of components (tuple).
    ///
    /// ```ignore
    /// let e = world.spawn((Tag::new("player"), Transform::from_xy(0.0, 1.0)));
    /// ```
    pub fn spawn<B: SpawnBundle>(&mut self, bundle: B) -> Entity {
        let entity = self.spawn_empty();
        bundle.insert_into(self, entity);
        entity
    }

    /// Spawn an entity with a single component.
    pub fn spawn_one<T: 'static + Send + Sync>(&mut self, component: T) -> Entity {
        self.spawn((component,))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    #[derive(Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }
    struct Health(u32);
    struct Marker;

    #[test]
    fn spawn_and_get() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 1.0, y: 2.0 }, Health(10)));
        assert_eq!(world.get::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));
        assert_eq!(world.get::<Health>(e).map(|h| h.0), Some(10));
        assert!(world.get::<Velocity>(e).is_none());
        assert!(world.has::<Health>(e));
    }

    #[test]
    fn despawn_invalidates_handle_everywhere() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 1.0 }));
        assert!(world.despawn(e));
        assert!(!world.is_alive(e));
        assert!(world.get::<Position>(e).is_none());
        assert!(world.entities_with::<Velocity>().is_empty());
        assert!(!world.despawn(e));
    }

    #[test]
    fn recycled_slot_does_not_leak_old_components() {
        let mut world = World::new();
        let old = world.spawn_one(Health(5));
        world.despawn(old);
        let new = world.spawn_empty();
        assert_eq!(old.index(), new.index());
        assert!(world.get::<Health>(new).is_none());
        assert!(world.get::<Health>(old).is_none());
    }

    #[test]
    fn component_reports_stale_and_missing() {
        let mut world = World::new();
        let e = world.spawn_one(Marker);
        match world.component::<Health>(e) {
            Err(AkkadError::MissingComponent { component, .. }) => assert_eq!(component, "Health"),
            other => panic!("unexpected {:?}", other.map(|h| h.0)),
        }
        world.despawn(e);
        assert!(matches!(world.component::<Marker>(e), Err(AkkadError::InvalidEntity(_))));
    }

    #[test]
    fn insert_replaces_and_remove_returns() {
        let mut world = World::new();
        let e = world.spawn_one(Health(1));
        world.insert(e, Health(2));
        assert_eq!(world.get::<Health>(e).map(|h| h.0), Some(2));
        assert_eq!(world.remove::<Health>(e).map(|h| h.0), Some(2));
        assert!(world.remove::<Health>(e).is_none());
    }

    #[test]
    #[should_panic(expected = "dead entity")]
    fn insert_on_dead_entity_panics() {
        let mut world = World::new();
        let e = world.spawn_empty();
        world.despawn(e);
        world.insert(e, Marker);
    }

    #[test]
    fn try_insert_on_dead_entity_errors() {
        let mut world = World::new();
        let e = world.spawn_empty();
        world.despawn(e);
        assert!(world.try_insert(e, Marker).is_err());
    }

    #[test]
    fn query_filtered_respects_marker() {
        let mut world = World::new();
        let marked = world.spawn((Health(1), Marker));
        world.spawn((Health(2),));

        let mut seen = Vec::new();
        world.query_filtered::<(&mut Health,), Marker>(|e, (h,)| {
            h.0 += 10;
            seen.push(e);
        });
        assert_eq!(seen, vec![marked]);
        assert_eq!(world.get::<Health>(marked).map(|h| h.0), Some(11));
    }

    #[test]
    #[should_panic(expected = "requested twice")]
    fn query_with_duplicate_type_panics() {
        let mut world = World::new();
        world.spawn_one(Health(1));
        world.query::<(&Health, &mut Health)>(|_, _| {});
    }

    #[test]
    fn entity_at_resolves_live_index() {
        let mut world = World::new();
        let a = world.spawn_empty();
        let b = world.spawn_empty();
        assert_eq!(world.entity_at(b.index()), Some(b));
        world.despawn(a);
        assert_eq!(world.entity_at(a.index()), None);
    }

    #[test]
    fn despawn_all_clears_world() {
        let mut world = World::new();
        world.spawn_one(Health(1));
        world.spawn_one(Health(2));
        world.despawn_all();
        assert_eq!(world.entity_count(), 0);
        assert!(world.entities_with::<Health>().is_empty());
    }

    #[test]
    fn component_names_are_short_and_sorted() {
        let mut world = World::new();
        let e = world.spawn((Velocity { dx: 0.0, dy: 0.0 }, Health(1)));
        assert_eq!(world.component_names(e), vec!["Health", "Velocity"]);
    }
}
