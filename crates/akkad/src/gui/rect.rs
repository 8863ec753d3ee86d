//! Constraint rectangles.
//!
//! A [`RectTransform`] holds one [`Constraint`] per axis quantity (x, y,
//! width, height) and the rect they resolved to against the parent's rect
//! during the last layout pass. Sizes resolve before positions because
//! `Center` positioning needs the node's own size.
//!
//! | kind       | width / height                 | x / y                                 |
//! |------------|--------------------------------|---------------------------------------|
//! | `Center`   | parent size                    | centred in parent, `value` px offset  |
//! | `Relative` | parent size × `value`          | parent min + parent size × `value`    |
//! | `Pixel`    | `value` px                     | parent min + `value` px               |
//! | `Aspect`   | the other dimension × `value`  | parent min + the other axis' parent size × `value` |

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    #[default]
    Center,
    Relative,
    Pixel,
    Aspect,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub value: f32,
}

impl Constraint {
    pub fn center(offset: f32) -> Self {
        Self { kind: ConstraintKind::Center, value: offset }
    }

    pub fn relative(fraction: f32) -> Self {
        Self { kind: ConstraintKind::Relative, value: fraction }
    }

    pub fn pixel(pixels: f32) -> Self {
        Self { kind: ConstraintKind::Pixel, value: pixels }
    }

    pub fn aspect(ratio: f32) -> Self {
        Self { kind: ConstraintKind::Aspect, value: ratio }
    }

    /// Size along an axis, given the parent's size on that axis. `None` for
    /// `Aspect`, which depends on the other dimension.
    fn direct_size(self, parent: f32) -> Option<f32> {
        match self.kind {
            ConstraintKind::Center => Some(parent),
            ConstraintKind::Relative => Some(parent * self.value),
            ConstraintKind::Pixel => Some(self.value),
            ConstraintKind::Aspect => None,
        }
    }

    fn position(self, parent_min: f32, parent_size: f32, other_parent_size: f32, size: f32) -> f32 {
        match self.kind {
            ConstraintKind::Center => parent_min + (parent_size - size) * 0.5 + self.value,
            ConstraintKind::Relative => parent_min + parent_size * self.value,
            ConstraintKind::Pixel => parent_min + self.value,
            ConstraintKind::Aspect => parent_min + other_parent_size * self.value,
        }
    }
}

/// Layout rectangle of a GUI entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectTransform {
    pub x: Constraint,
    pub y: Constraint,
    pub width: Constraint,
    pub height: Constraint,
    #[serde(skip)]
    rect: Rect,
}

impl RectTransform {
    pub fn new(x: Constraint, y: Constraint, width: Constraint, height: Constraint) -> Self {
        Self { x, y, width, height, rect: Rect::ZERO }
    }

    /// The rect from the last layout pass, in pixels (origin bottom-left).
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Resolve against `parent` and store the result.
    pub fn resolve(&mut self, parent: Rect) -> Rect {
        let parent_size = parent.size();
        let (w, h) = match (
            self.width.direct_size(parent_size.x),
            self.height.direct_size(parent_size.y),
        ) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w * self.height.value),
            (None, Some(h)) => (h * self.width.value, h),
            (None, None) => {
                log::warn!("rect has Aspect width and height; resolving to zero size");
                (0.0, 0.0)
            }
        };
        let x = self.x.position(parent.min.x, parent_size.x, parent_size.y, w);
        let y = self.y.position(parent.min.y, parent_size.y, parent_size.x, h);
        self.rect = Rect::from_pos_size(Vec2::new(x, y), Vec2::new(w, h));
        self.rect
    }
}

impl Default for RectTransform {
    /// Centred, half the parent's size.
    fn default() -> Self {
        Self::new(
            Constraint::center(0.0),
            Constraint::center(0.0),
            Constraint::relative(0.5),
            Constraint::relative(0.5),
        )
    }
}
