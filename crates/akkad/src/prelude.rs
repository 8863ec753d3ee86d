//! Convenience re-exports: `use akkad::prelude::*` for the common items.

// Core
pub use crate::asset::{AssetDescriptor, AssetKind, AssetRegistry};
pub use crate::config::SceneConfig;
pub use crate::context::EngineContext;
pub use crate::ecs::{Entity, IgnoreParentTransform, RelationShip, View, World};
pub use crate::error::{AkkadError, Result};
pub use crate::input::{CursorPosition, InputState, KeyCode, MouseButton};
pub use crate::math::{Mat4, Quat, Rect, Transform, Vec2, Vec3, Vec4};
pub use crate::scene::serialize::{SceneData, SceneRegistry};
pub use crate::scene::{Scene, SceneState, Tag};
pub use crate::script::{Script, ScriptComponent, ScriptContext, ScriptResult};
pub use crate::time::Time;

// Render 2D
pub use crate::render2d::{Camera2d, Color, ColoredSprite, CommandRecorder, LineRenderer, Renderer2d, Sprite};

// GUI
pub use crate::gui::{
    Constraint, ConstraintKind, GuiButton, GuiCheckBox, GuiContainer, GuiPanel, GuiSlider, GuiText,
    GuiTextInput, RectTransform, TextInputFlags,
};

// Physics
pub use crate::physics2d::{
    BodyShape2d, BodyState, BodyType2d, HingeJoint2d, NullPhysics2d, PhysicsEngine2d, RigidBody2d,
};
#[cfg(feature = "physics2d")]
pub use crate::physics2d::RapierPhysics2d;

// Diagnostics (feature-gated)
#[cfg(feature = "diagnostics")]
pub use crate::diag::SceneStats;
