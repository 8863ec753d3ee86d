//! Error types shared across the crate.

use thiserror::Error;

use crate::ecs::Entity;

/// Every recoverable failure the scene core reports.
#[derive(Debug, Error)]
pub enum AkkadError {
    /// The handle is stale or was never allocated by this world.
    #[error("invalid entity {0:?}")]
    InvalidEntity(Entity),

    #[error("{entity:?} has no `{component}` component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    /// Reparenting would make a node its own ancestor.
    #[error("cannot parent {child:?} under {parent:?}: would create a cycle")]
    CyclicReparent { parent: Entity, child: Entity },

    #[error("asset `{0}` could not be resolved")]
    AssetResolution(String),

    #[error("script on {entity:?} failed in {callback}: {message}")]
    Script {
        entity: Entity,
        callback: &'static str,
        message: String,
    },

    #[error("joint on {entity:?} not created: {reason}")]
    Joint { entity: Entity, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("picking buffer export failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AkkadError {
    pub(crate) fn missing<T: 'static>(entity: Entity) -> Self {
        AkkadError::MissingComponent {
            entity,
            component: short_type_name(std::any::type_name::<T>()),
        }
    }
}

/// Strip the module path from a type name (`akkad::math::Transform` → `Transform`).
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

pub type Result<T> = std::result::Result<T, AkkadError>;
