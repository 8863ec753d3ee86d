//! # Picking: Entity Ids as Pixel Colours
//!
//! Every frame the scene redraws each pickable sprite and GUI widget into a
//! CPU-side [`PickingBuffer`] as a flat quad whose colour is the entity's
//! `index + 1`. A pointer read decodes one pixel back into an entity.
//!
//! ```text
//!  id = index + 1          (0 is the cleared background)
//!  R = id & 0xFF,  G = (id >> 8) & 0xFF,  B = (id >> 16) & 0xFF,  A = 0xFF
//! ```
//!
//! Buffer coordinates have the origin at the bottom-left and Y growing
//! upward, like the GUI pixel projection. Window cursor positions grow
//! downward, so [`cursor_to_buffer`] subtracts the viewport offset and flips Y.
//!
//! The game-object pass writes first and the GUI pass second, so a widget
//! covers any sprite underneath it.
//!
//! Pixels hold only the slot index. The buffer remembers the generation it
//! drew for each index, so a slot recycled between the picking pass and the
//! read resolves to nothing instead of to an entity that was never drawn.

use std::collections::HashMap;
use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::ecs::{Entity, World};
use crate::error::Result;
use crate::math::{Mat4, Rect, UVec2, Vec2, Vec4};

/// Largest index that fits in 24 bits after the `+ 1` shift.
pub const MAX_PICKABLE_INDEX: u32 = 0x00FF_FFFE;

/// Background pixel.
pub const NO_ENTITY: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Encode an entity index as a picking colour. `None` past 24 bits.
pub fn encode_index(index: u32) -> Option<Rgba<u8>> {
    if index > MAX_PICKABLE_INDEX {
        return None;
    }
    let id = index + 1;
    Some(Rgba([
        (id & 0xFF) as u8,
        ((id >> 8) & 0xFF) as u8,
        ((id >> 16) & 0xFF) as u8,
        0xFF,
    ]))
}

/// Decode a picking colour. `None` for the background.
pub fn decode_index(pixel: Rgba<u8>) -> Option<u32> {
    let [r, g, b, _] = pixel.0;
    let id = u32::from(r) | (u32::from(g) << 8) | (u32::from(b) << 16);
    id.checked_sub(1)
}

/// Off-screen id buffer sized to the viewport.
#[derive(Debug, Clone)]
pub struct PickingBuffer {
    image: RgbaImage,
    /// Generation drawn for each index since the last clear.
    drawn: HashMap<u32, u32>,
}

impl PickingBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, NO_ENTITY),
            drawn: HashMap::new(),
        }
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.image.width(), self.image.height())
    }

    /// Resize and clear. A no-op if the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.image.width() != width || self.image.height() != height {
            self.image = RgbaImage::from_pixel(width, height, NO_ENTITY);
            self.drawn.clear();
        }
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = NO_ENTITY;
        }
        self.drawn.clear();
    }

    /// Colour for `entity`, remembering its generation.
    fn id_color(&mut self, entity: Entity) -> Option<Rgba<u8>> {
        let Some(color) = encode_index(entity.index) else {
            log::warn!("entity index {} is too large to pick", entity.index);
            return None;
        };
        self.drawn.insert(entity.index, entity.generation);
        Some(color)
    }

    /// The entity drawn under `index` since the last clear.
    pub fn drawn(&self, index: u32) -> Option<Entity> {
        self.drawn
            .get(&index)
            .map(|&generation| Entity { index, generation })
    }

    fn put(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        // Row 0 of the image is the top edge.
        let row = self.image.height() - 1 - y;
        self.image.put_pixel(x, row, color);
    }

    /// Clamp `[min, max)` in pixel space to buffer column/row ranges.
    fn pixel_span(&self, min: Vec2, max: Vec2) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let x0 = min.x.floor().clamp(0.0, w) as u32;
        let y0 = min.y.floor().clamp(0.0, h) as u32;
        let x1 = max.x.ceil().clamp(0.0, w) as u32;
        let y1 = max.y.ceil().clamp(0.0, h) as u32;
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    /// Fill every pixel whose centre lies in `rect` (pixel space) with the
    /// id of `entity`.
    pub fn fill_rect(&mut self, rect: Rect, entity: Entity) {
        let Some(color) = self.id_color(entity) else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.pixel_span(rect.min, rect.max) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                if rect.contains(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
                    self.put(x, y, color);
                }
            }
        }
    }

    /// Fill the unit quad (-0.5..0.5) under `model`, projected through
    /// `view_projection`, with the id of `entity`.
    pub fn fill_quad(&mut self, model: &Mat4, view_projection: &Mat4, entity: Entity) {
        let Some(color) = self.id_color(entity) else {
            return;
        };
        let size = Vec2::new(self.image.width() as f32, self.image.height() as f32);
        let mvp = *view_projection * *model;
        let corners = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)].map(|(x, y)| {
            let clip = mvp * Vec4::new(x, y, 0.0, 1.0);
            let ndc = Vec2::new(clip.x, clip.y) / clip.w;
            (ndc + Vec2::ONE) * 0.5 * size
        });

        let min = corners.iter().fold(Vec2::splat(f32::MAX), |m, c| m.min(*c));
        let max = corners.iter().fold(Vec2::splat(f32::MIN), |m, c| m.max(*c));
        let Some((x0, y0, x1, y1)) = self.pixel_span(min, max) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                if inside_convex(&corners, Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
                    self.put(x, y, color);
                }
            }
        }
    }

    /// Raw id at a buffer coordinate.
    pub fn read(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.image.width() || y >= self.image.height() {
            return None;
        }
        let row = self.image.height() - 1 - y;
        decode_index(*self.image.get_pixel(x, row))
    }

    /// Write the buffer to a PNG for debugging.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Half-plane test against a convex polygon of either winding.
fn inside_convex(corners: &[Vec2; 4], p: Vec2) -> bool {
    let mut sign = 0.0_f32;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let cross = (b - a).perp_dot(p - a);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

/// Map a window cursor position into buffer coordinates.
///
/// `viewport` is the scene's rectangle in window space (Y down). Points on
/// or outside its edge give `None`.
pub fn cursor_to_buffer(cursor: Vec2, viewport: Rect, buffer_height: u32) -> Option<UVec2> {
    let inside = cursor.x > viewport.min.x
        && cursor.y > viewport.min.y
        && cursor.x < viewport.max.x
        && cursor.y < viewport.max.y;
    if !inside {
        return None;
    }
    let bx = (cursor.x - viewport.min.x) as u32;
    let by = (cursor.y - viewport.min.y) as u32;
    let flipped = (buffer_height as i64) - (by as i64) - 1;
    (flipped >= 0).then(|| UVec2::new(bx, flipped as u32))
}

/// Resolve a buffer coordinate to the live entity drawn there.
pub fn pick(world: &World, buffer: &PickingBuffer, at: UVec2) -> Option<Entity> {
    let index = buffer.read(at.x, at.y)?;
    let entity = buffer.drawn(index).filter(|e| world.is_alive(*e));
    if entity.is_none() {
        log::warn!("picked index {index} is not a live entity");
    }
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Vec3};

    fn entities(n: usize) -> (World, Vec<Entity>) {
        let mut world = World::new();
        let list = (0..n).map(|_| world.spawn_empty()).collect();
        (world, list)
    }

    #[test]
    fn encode_decode_round_trip() {
        for index in [0, 1, 254, 255, 256, 65_535, 65_536, 1_000_000, MAX_PICKABLE_INDEX] {
            let color = encode_index(index).unwrap();
            assert_eq!(decode_index(color), Some(index));
        }
        assert!(encode_index(MAX_PICKABLE_INDEX + 1).is_none());
    }

    #[test]
    fn background_decodes_to_nothing() {
        assert_eq!(decode_index(NO_ENTITY), None);
        let buffer = PickingBuffer::new(4, 4);
        assert_eq!(buffer.read(1, 1), None);
        assert_eq!(buffer.read(10, 10), None);
    }

    #[test]
    fn rect_fill_uses_bottom_left_origin() {
        let (_, e) = entities(8);
        let mut buffer = PickingBuffer::new(10, 10);
        buffer.fill_rect(Rect::new(Vec2::ZERO, Vec2::new(5.0, 2.0)), e[7]);
        assert_eq!(buffer.read(0, 0), Some(7));
        assert_eq!(buffer.read(4, 1), Some(7));
        assert_eq!(buffer.read(5, 1), None);
        assert_eq!(buffer.read(0, 9), None);
    }

    #[test]
    fn later_fill_overwrites() {
        let (_, e) = entities(3);
        let mut buffer = PickingBuffer::new(10, 10);
        buffer.fill_rect(Rect::new(Vec2::ZERO, Vec2::splat(10.0)), e[1]);
        buffer.fill_rect(Rect::new(Vec2::splat(2.0), Vec2::splat(4.0)), e[2]);
        assert_eq!(buffer.read(3, 3), Some(2));
        assert_eq!(buffer.read(8, 8), Some(1));
    }

    #[test]
    fn quad_projects_through_camera() {
        let (_, e) = entities(4);
        let mut buffer = PickingBuffer::new(100, 100);
        let vp = Mat4::orthographic_rh(-5.0, 5.0, -5.0, 5.0, -1.0, 1.0);
        let model = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 2.0, 1.0),
            Quat::IDENTITY,
            Vec3::new(2.0, 0.0, 0.0),
        );
        buffer.fill_quad(&model, &vp, e[3]);
        // World (2, 0) is pixel (70, 50); the quad spans 60..80.
        assert_eq!(buffer.read(70, 50), Some(3));
        assert_eq!(buffer.read(61, 41), Some(3));
        assert_eq!(buffer.read(50, 50), None);
    }

    #[test]
    fn cursor_is_offset_and_flipped() {
        let viewport = Rect::new(Vec2::new(100.0, 50.0), Vec2::new(300.0, 250.0));
        assert_eq!(
            cursor_to_buffer(Vec2::new(110.0, 60.0), viewport, 200),
            Some(UVec2::new(10, 189))
        );
        assert_eq!(cursor_to_buffer(Vec2::new(100.0, 60.0), viewport, 200), None);
        assert_eq!(cursor_to_buffer(Vec2::new(400.0, 60.0), viewport, 200), None);
    }

    #[test]
    fn stale_pick_is_no_selection() {
        let mut world = World::new();
        let e = world.spawn_empty();
        let mut buffer = PickingBuffer::new(4, 4);
        buffer.fill_rect(Rect::new(Vec2::ZERO, Vec2::splat(4.0)), e);
        assert_eq!(pick(&world, &buffer, UVec2::new(1, 1)), Some(e));
        world.despawn(e);
        assert_eq!(pick(&world, &buffer, UVec2::new(1, 1)), None);
    }

    #[test]
    fn recycled_slot_is_not_picked() {
        let mut world = World::new();
        let drawn = world.spawn_empty();
        let mut buffer = PickingBuffer::new(4, 4);
        buffer.fill_rect(Rect::new(Vec2::ZERO, Vec2::splat(4.0)), drawn);

        world.despawn(drawn);
        let newcomer = world.spawn_empty();
        assert_eq!(newcomer.index(), drawn.index());
        assert_eq!(buffer.read(1, 1), Some(drawn.index()));
        assert_eq!(pick(&world, &buffer, UVec2::new(1, 1)), None);

        buffer.clear();
        assert_eq!(buffer.drawn(drawn.index()), None);
        buffer.fill_rect(Rect::new(Vec2::ZERO, Vec2::splat(4.0)), newcomer);
        assert_eq!(pick(&world, &buffer, UVec2::new(1, 1)), Some(newcomer));
    }
}
