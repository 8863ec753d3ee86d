//! Pointer and keyboard dispatch to GUI widgets.
//!
//! Hit tests read the picking buffer written by the previous render pass.
//!
//! ```text
//!  pointer-down edge ──▶ pick ──▶ GuiButton    → callback, focus cleared
//!                               ├─ GuiCheckBox  → toggle, focus cleared
//!                               ├─ GuiTextInput → focus
//!                               ├─ GuiSlider    → start drag, focus cleared
//!                               └─ nothing      → focus cleared
//!  pointer held      ──▶ dragged slider knob follows the cursor
//!  typed character   ──▶ focused text input
//! ```

use crate::ecs::{Entity, World};
use crate::input::{InputState, MouseButton};
use crate::math::Rect;
use crate::picking::{PickingBuffer, cursor_to_buffer, pick};

use super::layout::is_pickable_widget;
use super::rect::RectTransform;
use super::widgets::{GuiButton, GuiCheckBox, GuiSlider, GuiTextInput};

/// Focus and drag state carried between frames.
#[derive(Debug, Default)]
pub struct GuiDispatch {
    focused: Option<Entity>,
    dragging: Option<Entity>,
}

impl GuiDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The text input receiving keyboard characters.
    pub fn focused(&self) -> Option<Entity> {
        self.focused
    }

    pub fn dragging(&self) -> Option<Entity> {
        self.dragging
    }

    pub fn reset(&mut self) {
        self.focused = None;
        self.dragging = None;
    }

    /// Run one frame of GUI input. Returns the widget hit by a pointer-down
    /// edge this frame, if any.
    pub fn dispatch(
        &mut self,
        world: &mut World,
        input: &InputState,
        buffer: &PickingBuffer,
        viewport: Rect,
    ) -> Option<Entity> {
        let at = cursor_to_buffer(input.cursor().as_vec2(), viewport, buffer.size().y);
        let mut hit = None;

        if input.mouse_just_pressed(MouseButton::Left) {
            hit = at
                .and_then(|at| pick(world, buffer, at))
                .filter(|e| is_pickable_widget(world, *e));
            self.pointer_down(world, hit);
        }

        if !input.mouse_pressed(MouseButton::Left) {
            self.dragging = None;
        }
        if let (Some(slider), Some(at)) = (self.dragging, at) {
            let rect = world.get::<RectTransform>(slider).map(RectTransform::rect);
            match (rect, world.get_mut::<GuiSlider>(slider)) {
                (Some(rect), Some(s)) => s.set_knob_x(at.x as f32 - rect.min.x, rect.width()),
                _ => self.dragging = None,
            }
        }

        if let Some(c) = input.last_char() {
            self.type_char(world, c);
        }
        hit
    }

    fn pointer_down(&mut self, world: &mut World, hit: Option<Entity>) {
        self.focused = None;
        self.dragging = None;
        let Some(entity) = hit else {
            return;
        };
        if let Some(button) = world.get_mut::<GuiButton>(entity) {
            button.click();
        }
        if let Some(checkbox) = world.get_mut::<GuiCheckBox>(entity) {
            checkbox.toggle();
        }
        if world.has::<GuiTextInput>(entity) {
            self.focused = Some(entity);
        }
        if world.has::<GuiSlider>(entity) {
            self.dragging = Some(entity);
        }
    }

    fn type_char(&mut self, world: &mut World, c: char) {
        let Some(focused) = self.focused else {
            return;
        };
        match world.get_mut::<GuiTextInput>(focused) {
            Some(text) => text.type_char(c),
            None => self.focused = None,
        }
    }
}
