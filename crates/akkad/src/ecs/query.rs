//! # Query: Iterating Over Entities by Component Type
//!
//! Two ways to walk entities that hold a set of component types:
//!
//! - [`World::query`](super::world::World::query): closure-based, yields
//!   `&T` / `&mut T` items. Needs `&mut World`.
//! - [`World::view`](super::world::World::view): a lazy, restartable
//!   [`View`] over `&World` that yields entities and exposes per-type `get`.
//!
//! ## Closure-Based Mutable Queries
//!
//! ```text
//! world.query::<(&mut Transform, &RigidBody2d)>(|entity, (tf, body)| { ... });
//!
//! 1. TypeIds: [Transform, RigidBody2d]
//! 2. Pick the smallest storage as the driver and snapshot its owners
//! 3. Extract each storage from the world's map (owned Box<SparseSet<T>>)
//! 4. For each driver entity present in every storage, fetch and call
//! 5. Restore the storages
//! ```
//!
//! Extracting gives the borrow checker disjoint owned storages, so `&mut A`
//! and `&B` can be handed out together without unsafe code.
//!
//! ## Views
//!
//! A view borrows the world immutably, so storage cannot change while it is
//! alive. Iterating it twice yields the same sequence. Callers that need to
//! mutate collect the entities first:
//!
//! ```ignore
//! let targets: Vec<Entity> = world.view::<(Transform, RelationShip)>().iter().collect();
//! for e in targets { world.get_mut::<Transform>(e) ... }
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;

use super::entity::Entity;
use super::storage::{ComponentStorage, SparseSet};
use super::world::World;

pub type Storages = HashMap<TypeId, Box<dyn ComponentStorage>>;

/// Trait for types that can be fetched from a component storage.
///
/// Implemented for `&T` (shared read) and `&mut T` (exclusive write), and for
/// tuples of those: `(&A, &mut B, &C)`.
pub trait QueryParam {
    /// The item yielded per entity.
    type Item<'w>;

    /// Owned storage data extracted from the world.
    type Column;

    /// The component TypeIds this parameter needs.
    fn type_ids() -> Vec<TypeId>;

    /// Take the needed storage(s) out of the world's storage map.
    ///
    /// Callers check that every storage exists before extracting.
    #[doc(hidden)]
    fn extract(storages: &mut Storages) -> Self::Column;

    /// Put the storage(s) back.
    #[doc(hidden)]
    fn restore(col: Self::Column, storages: &mut Storages);

    #[doc(hidden)]
    fn contains(col: &Self::Column, entity: Entity) -> bool;

    /// Fetch the item for `entity`. Only called after `contains` succeeded.
    #[doc(hidden)]
    fn fetch(col: &mut Self::Column, entity: Entity) -> Self::Item<'_>;
}

fn extract_set<T: 'static + Send + Sync>(storages: &mut Storages) -> Box<SparseSet<T>> {
    storages
        .remove(&TypeId::of::<T>())
        .and_then(|storage| storage.into_any().downcast::<SparseSet<T>>().ok())
        .unwrap_or_else(|| {
            panic!(
                "Query extract: storage for `{}` not found",
                std::any::type_name::<T>()
            )
        })
}

fn restore_set<T: 'static + Send + Sync>(set: Box<SparseSet<T>>, storages: &mut Storages) {
    storages.insert(TypeId::of::<T>(), set);
}

/// Shared read access to a component.
impl<T: 'static + Send + Sync> QueryParam for &T {
    type Item<'w> = &'w T;
    type Column = Box<SparseSet<T>>;

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(storages: &mut Storages) -> Self::Column {
        extract_set::<T>(storages)
    }

    fn restore(col: Self::Column, storages: &mut Storages) {
        restore_set(col, storages);
    }

    fn contains(col: &Self::Column, entity: Entity) -> bool {
        col.contains(entity)
    }

    fn fetch(col: &mut Self::Column, entity: Entity) -> Self::Item<'_> {
        col.get(entity).unwrap_or_else(|| {
            panic!(
                "Query fetch: {:?} has no `{}`",
                entity,
                std::any::type_name::<T>()
            )
        })
    }
}

/// Exclusive write access to a component.
impl<T: 'static + Send + Sync> QueryParam for &mut T {
    type Item<'w> = &'w mut T;
    type Column = Box<SparseSet<T>>;

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(storages: &mut Storages) -> Self::Column {
        extract_set::<T>(storages)
    }

    fn restore(col: Self::Column, storages: &mut Storages) {
        restore_set(col, storages);
    }

    fn contains(col: &Self::Column, entity: Entity) -> bool {
        col.contains(entity)
    }

    fn fetch(col: &mut Self::Column, entity: Entity) -> Self::Item<'_> {
        col.get_mut(entity).unwrap_or_else(|| {
            panic!(
                "Query fetch: {:?} has no `{}`",
                entity,
                std::any::type_name::<T>()
            )
        })
    }
}

macro_rules! impl_query_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: QueryParam),+> QueryParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Column = ($($P::Column,)+);

            fn type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($P::type_ids());)+
                ids
            }

            #[allow(non_snake_case)]
            fn extract(storages: &mut Storages) -> Self::Column {
                ($($P::extract(storages),)+)
            }

            #[allow(non_snake_case)]
            fn restore(col: Self::Column, storages: &mut Storages) {
                let ($($P,)+) = col;
                $($P::restore($P, storages);)+
            }

            #[allow(non_snake_case)]
            fn contains(col: &Self::Column, entity: Entity) -> bool {
                let ($($P,)+) = col;
                true $(&& $P::contains($P, entity))+
            }

            #[allow(non_snake_case)]
            fn fetch(col: &mut Self::Column, entity: Entity) -> Self::Item<'_> {
                let ($($P,)+) = col;
                ($($P::fetch($P, entity),)+)
            }
        }
    };
}

impl_query_param_tuple!(A);
impl_query_param_tuple!(A, B);
impl_query_param_tuple!(A, B, C);
impl_query_param_tuple!(A, B, C, D);
impl_query_param_tuple!(A, B, C, D, E);
impl_query_param_tuple!(A, B, C, D, E, F);

// ── Views ────────────────────────────────────────────────────────────────

/// A set of component types named by a [`View`], written as a tuple of the
/// component types themselves: `(Transform, Sprite)`.
pub trait ComponentSet {
    fn type_ids() -> Vec<TypeId>;
}

macro_rules! impl_component_set {
    ($($T:ident),+) => {
        impl<$($T: 'static + Send + Sync),+> ComponentSet for ($($T,)+) {
            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$T>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);

/// Lazy, restartable sequence of entities holding every type in `S`.
///
/// Created by [`World::view`](super::world::World::view).
pub struct View<'w, S: ComponentSet> {
    world: &'w World,
    required: Vec<TypeId>,
    driver: &'w [Entity],
    _set: PhantomData<fn() -> S>,
}

impl<'w, S: ComponentSet> View<'w, S> {
    pub(crate) fn new(world: &'w World) -> Self {
        let required = S::type_ids();
        let driver = world.smallest_owner_list(&required).unwrap_or(&[]);
        Self {
            world,
            required,
            driver,
            _set: PhantomData,
        }
    }

    /// Iterate matching entities from the start.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.driver
            .iter()
            .copied()
            .filter(move |entity| self.contains(*entity))
    }

    /// Returns `true` if `entity` holds every component in the view.
    pub fn contains(&self, entity: Entity) -> bool {
        self.required
            .iter()
            .all(|tid| self.world.storage_contains(*tid, entity))
    }

    /// Fetch one component of a matched entity.
    pub fn get<T: 'static + Send + Sync>(&self, entity: Entity) -> Option<&'w T> {
        self.world.get::<T>(entity)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}
