//! # Render2d: Scene Drawing Through a Backend Seam
//!
//! The scene never talks to a GPU. It walks its components once per frame and
//! issues calls on a [`Renderer2d`]:
//!
//! ```text
//!  Camera2d + Transform ──▶ view-projection ──▶ begin_scene(vp)
//!                                                   │
//!  for layer in sorting_layers (back → front):      ▼
//!    Sprite (layer)           ──▶ draw_sprite / draw_colored_quad
//!    ColoredSprite            ──▶ draw_colored_quad (first layer only)
//!    scripts.on_render_2d(layer)
//!  LineRenderer               ──▶ draw_line
//!                                                   │
//!                                               end_scene()
//!  GUI (pixel ortho)          ──▶ draw_rect / render_text
//! ```
//!
//! [`CommandRecorder`] is a headless backend that stores the calls as
//! [`DrawCommand`]s. Tests and examples use it in place of a GPU renderer.

use serde::{Deserialize, Serialize};

use crate::math::{Mat4, Rect, Transform, Vec2, Vec3};

/// Layer used by sprites that don't name one.
pub const DEFAULT_SORTING_LAYER: &str = "Default";

/// An RGBA color with floating-point components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const RED: Self = Self { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const GREEN: Self = Self { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
    pub const BLUE: Self = Self { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };
    pub const GRAY: Self = Self { r: 0.5, g: 0.5, b: 0.5, a: 1.0 };
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    /// Create a color from RGB (alpha = 1).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A textured sprite. Pair with [`Transform`]; the transform scale is the
/// sprite size in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sprite {
    /// Material asset id. `None` draws a solid quad in `color`.
    pub material: Option<String>,
    pub color: Color,
    pub sorting_layer: String,
}

impl Sprite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn material(mut self, id: impl Into<String>) -> Self {
        self.material = Some(id.into());
        self
    }

    pub fn layer(mut self, layer: impl Into<String>) -> Self {
        self.sorting_layer = layer.into();
        self
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            material: None,
            color: Color::WHITE,
            sorting_layer: DEFAULT_SORTING_LAYER.to_string(),
        }
    }
}

/// A solid-color quad. Always drawn in the first sorting layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColoredSprite {
    pub color: Color,
}

/// A list of world-space line segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineRenderer {
    pub points: Vec<(Vec2, Vec2)>,
    pub color: Color,
    pub active: bool,
}

impl Default for LineRenderer {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            color: Color::WHITE,
            active: true,
        }
    }
}

/// Orthographic 2D camera. Pair with [`Transform`].
///
/// `size` is the half-height of the visible area in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera2d {
    pub size: f32,
    pub active: bool,
}

impl Default for Camera2d {
    fn default() -> Self {
        Self {
            size: 5.0,
            active: true,
        }
    }
}

impl Camera2d {
    /// Projection times inverse camera pose. Scale on the camera transform is
    /// ignored.
    pub fn view_projection(&self, transform: &Transform, aspect: f32) -> Mat4 {
        let half_h = self.size;
        let half_w = self.size * aspect;
        let projection = Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, -1.0, 1.0);
        let view = Mat4::from_rotation_translation(transform.world_rotation(), transform.world_translation())
            .inverse();
        projection * view
    }
}

/// Backend the scene draws through.
pub trait Renderer2d {
    fn clear(&mut self);

    fn begin_scene(&mut self, view_projection: Mat4);

    fn end_scene(&mut self);

    /// `model` maps the unit quad (-0.5..0.5) into world space.
    fn draw_sprite(&mut self, sprite: &Sprite, model: &Mat4);

    fn draw_colored_quad(&mut self, color: Color, model: &Mat4);

    /// GUI rect in pixel space under `projection`.
    fn draw_rect(&mut self, rect: Rect, color: Color, projection: &Mat4);

    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color);

    fn render_text(&mut self, text: &str, bounds: Rect, color: Color, font_size: u32, projection: &Mat4);
}

/// A recorded [`Renderer2d`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    BeginScene(Mat4),
    EndScene,
    Sprite { material: Option<String>, color: Color, model: Mat4 },
    ColoredQuad { color: Color, model: Mat4 },
    Rect { rect: Rect, color: Color },
    Line { from: Vec3, to: Vec3, color: Color },
    Text { text: String, bounds: Rect, color: Color, font_size: u32 },
}

/// Headless [`Renderer2d`] that records every call.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    pub commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything recorded so far.
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn count(&self, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

impl Renderer2d for CommandRecorder {
    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn begin_scene(&mut self, view_projection: Mat4) {
        self.commands.push(DrawCommand::BeginScene(view_projection));
    }

    fn end_scene(&mut self) {
        self.commands.push(DrawCommand::EndScene);
    }

    fn draw_sprite(&mut self, sprite: &Sprite, model: &Mat4) {
        self.commands.push(DrawCommand::Sprite {
            material: sprite.material.clone(),
            color: sprite.color,
            model: *model,
        });
    }

    fn draw_colored_quad(&mut self, color: Color, model: &Mat4) {
        self.commands.push(DrawCommand::ColoredQuad { color, model: *model });
    }

    fn draw_rect(&mut self, rect: Rect, color: Color, _projection: &Mat4) {
        self.commands.push(DrawCommand::Rect { rect, color });
    }

    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color) {
        self.commands.push(DrawCommand::Line { from, to, color });
    }

    fn render_text(&mut self, text: &str, bounds: Rect, color: Color, font_size: u32, _projection: &Mat4) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            bounds,
            color,
            font_size,
        });
    }
}
