//! # Akkad: 2D Scene Core
//!
//! An entity-component-system scene runtime for 2D games: sparse-set component
//! storage, an intrusive parent/child hierarchy, transform propagation, a
//! physics bridge, colour-encoded picking, constraint-based GUI layout with
//! input dispatch and a deferred destruction queue, driven frame by frame
//! through a [`Scene`](scene::Scene).
//!
//! Start with `use akkad::prelude::*`, build a [`Scene`](scene::Scene) and
//! call [`Scene::frame`](scene::Scene::frame) once per frame with an
//! [`EngineContext`](context::EngineContext) and a
//! [`Renderer2d`](render2d::Renderer2d).

pub mod asset;
pub mod config;
pub mod context;
pub mod ecs;
pub mod error;
pub mod gui;
pub mod input;
pub mod math;
pub mod physics2d;
pub mod picking;
pub mod prelude;
pub mod render2d;
pub mod scene;
pub mod script;
pub mod time;

#[cfg(feature = "diagnostics")]
pub mod diag;

pub use error::{AkkadError, Result};
