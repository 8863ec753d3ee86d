//! Scene configuration.
//!
//! ```ignore
//! let config = SceneConfig::default()
//!     .with_viewport_size(1280.0, 720.0)
//!     .with_gravity(0.0, -9.81)
//!     .with_sorting_layers(["Background", "Default", "Foreground"]);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::Vec2;

/// Static settings of a [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Viewport size in pixels. Sizes the picking buffer and the GUI container.
    pub viewport_size: Vec2,
    pub gravity: Vec2,
    /// Physics step in seconds.
    pub fixed_timestep: f32,
    /// Render order of sprite layers, back to front.
    pub sorting_layers: Vec<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            viewport_size: Vec2::new(800.0, 800.0),
            gravity: Vec2::new(0.0, -10.0),
            fixed_timestep: 1.0 / 60.0,
            sorting_layers: vec![crate::render2d::DEFAULT_SORTING_LAYER.to_string()],
        }
    }
}

impl SceneConfig {
    pub fn with_viewport_size(mut self, width: f32, height: f32) -> Self {
        self.viewport_size = Vec2::new(width, height);
        self
    }

    pub fn with_gravity(mut self, x: f32, y: f32) -> Self {
        self.gravity = Vec2::new(x, y);
        self
    }

    pub fn with_fixed_timestep(mut self, seconds: f32) -> Self {
        self.fixed_timestep = seconds;
        self
    }

    pub fn with_sorting_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sorting_layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Read a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
