//! # Sparse-Set ECS
//!
//! A small Entity Component System: generational entity handles, one sparse
//! set per component type, closure-based mutable queries and borrowing views.
//! The scene's parent/child model is layered on top as an ordinary component.
//!
//! ## Module Overview
//!
//! - [`entity`]: Generational entity IDs
//! - `storage`: Per-type sparse sets behind a type-erased trait
//! - [`world`]: Central container (entities + component storages)
//! - [`query`]: Closure queries and restartable views
//! - [`hierarchy`]: `RelationShip` links and transform propagation

pub mod entity;
pub mod hierarchy;
pub mod query;
pub(crate) mod storage;
pub mod world;

pub use entity::Entity;
pub use hierarchy::{IgnoreParentTransform, RelationShip, propagate_transforms};
pub use query::View;
pub use world::World;
