//! Math types and glam re-exports.
//!
//! [`Transform`] carries the local translation/rotation/scale of an entity
//! plus the parent-derived offsets written by
//! [`propagate_transforms`](crate::ecs::hierarchy::propagate_transforms).
//! [`Rect`] is an axis-aligned rectangle used by GUI layout and picking.

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Quat, UVec2, Vec2, Vec3, Vec4};

/// Local transform plus cached parent offsets.
///
/// The world pose is `parent_translation + parent_rotation * translation` and
/// `parent_rotation * rotation`. Scale is never inherited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    #[serde(skip)]
    pub(crate) parent_translation: Vec3,
    #[serde(skip)]
    pub(crate) parent_rotation: Quat,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        parent_translation: Vec3::ZERO,
        parent_rotation: Quat::IDENTITY,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    /// Create a transform at the given 2D position (z = 0).
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self::from_xyz(x, y, 0.0)
    }

    /// Return a copy rotated to `angle` radians about Z.
    pub fn with_rotation_z(mut self, angle: f32) -> Self {
        self.rotation = Quat::from_rotation_z(angle);
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Return a copy with a 2D size as its X/Y scale.
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.scale = Vec3::new(width, height, 1.0);
        self
    }

    /// Rotation about Z in radians.
    pub fn rotation_z(&self) -> f32 {
        quat_to_angle(self.rotation)
    }

    pub fn parent_translation(&self) -> Vec3 {
        self.parent_translation
    }

    pub fn parent_rotation(&self) -> Quat {
        self.parent_rotation
    }

    pub(crate) fn set_parent_offset(&mut self, translation: Vec3, rotation: Quat) {
        self.parent_translation = translation;
        self.parent_rotation = rotation;
    }

    pub(crate) fn clear_parent_offset(&mut self) {
        self.set_parent_offset(Vec3::ZERO, Quat::IDENTITY);
    }

    /// World-space translation.
    pub fn world_translation(&self) -> Vec3 {
        self.parent_translation + self.parent_rotation * self.translation
    }

    /// World-space rotation.
    pub fn world_rotation(&self) -> Quat {
        self.parent_rotation * self.rotation
    }

    /// Model matrix without parent offsets.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// World model matrix, recomputed from the cached parent offsets.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            self.world_rotation(),
            self.world_translation(),
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Extract the Z rotation angle from a quaternion.
pub fn quat_to_angle(q: Quat) -> f32 {
    let (z, _y, _x) = q.to_euler(glam::EulerRot::ZYX);
    z
}

/// Build a Z-axis quaternion from an angle.
pub fn angle_to_quat(angle: f32) -> Quat {
    Quat::from_rotation_z(angle)
}

/// An axis-aligned rectangle. In GUI and picking space the origin is the
/// bottom-left corner and Y grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub const ZERO: Self = Self {
        min: Vec2::ZERO,
        max: Vec2::ZERO,
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Build from a bottom-left corner and a size.
    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: pos + size,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Half-open containment: `min` inclusive, `max` exclusive.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }

    /// Shrink by `fraction` of the size on every side.
    pub fn inset(&self, fraction: f32) -> Self {
        let pad = self.size() * fraction;
        Self {
            min: self.min + pad,
            max: self.max - pad,
        }
    }

    /// Model matrix mapping the unit quad (-0.5..0.5) onto this rect.
    pub fn quad_matrix(&self) -> Mat4 {
        let c = self.center();
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.width(), self.height(), 1.0),
            Quat::IDENTITY,
            Vec3::new(c.x, c.y, 0.0),
        )
    }
}
