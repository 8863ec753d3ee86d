//! GUI widget components.
//!
//! Widgets carry their own state and colours; their rect comes from the
//! sibling [`RectTransform`](super::RectTransform) on the same entity.

use serde::{Deserialize, Serialize};

use crate::math::{Mat4, Rect, Vec2};
use crate::render2d::Color;

/// Root of a GUI tree. Holds the screen size the tree lays out against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuiContainer {
    pub screen_size: Vec2,
}

impl GuiContainer {
    pub fn new(screen_size: Vec2) -> Self {
        Self { screen_size }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(Vec2::ZERO, self.screen_size)
    }

    /// Pixel-space orthographic projection, origin bottom-left.
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(0.0, self.screen_size.x, 0.0, self.screen_size.y, -1.0, 1.0)
    }
}

impl Default for GuiContainer {
    fn default() -> Self {
        Self::new(Vec2::new(800.0, 800.0))
    }
}

pub type ButtonCallback = Box<dyn FnMut() + Send + Sync>;

/// Clickable rect. The callback fires once per pointer-down edge.
#[derive(Serialize, Deserialize)]
pub struct GuiButton {
    pub color: Color,
    #[serde(skip)]
    callback: Option<ButtonCallback>,
}

impl GuiButton {
    pub fn new(color: Color) -> Self {
        Self { color, callback: None }
    }

    pub fn on_click(mut self, callback: impl FnMut() + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn set_callback(&mut self, callback: impl FnMut() + Send + Sync + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn click(&mut self) {
        if let Some(callback) = self.callback.as_mut() {
            callback();
        }
    }
}

impl Default for GuiButton {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

impl std::fmt::Debug for GuiButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuiButton")
            .field("color", &self.color)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuiCheckBox {
    pub checked: bool,
    pub box_color: Color,
    pub mark_color: Color,
}

impl GuiCheckBox {
    pub fn toggle(&mut self) {
        self.checked = !self.checked;
    }

    /// The check mark sits inset inside the box.
    pub fn mark_rect(&self, rect: Rect) -> Rect {
        rect.inset(0.2)
    }
}

impl Default for GuiCheckBox {
    fn default() -> Self {
        Self {
            checked: false,
            box_color: Color::WHITE,
            mark_color: Color::BLACK,
        }
    }
}

/// Behaviour flags of a text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextInputFlags {
    /// Display every character as `*`.
    pub password: bool,
    /// Accept ASCII digits only.
    pub numbers_only: bool,
}

const BACKSPACE: char = '\u{8}';

/// Single-line text field. Receives typed characters while focused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiTextInput {
    pub text: String,
    pub flags: TextInputFlags,
    pub color: Color,
    pub text_color: Color,
    pub font_size: u32,
}

impl GuiTextInput {
    pub fn with_flags(mut self, flags: TextInputFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Apply one typed character. Backspace deletes; anything outside
    /// printable ASCII is ignored.
    pub fn type_char(&mut self, c: char) {
        if c == BACKSPACE {
            self.text.pop();
            return;
        }
        if !c.is_ascii() || c.is_ascii_control() {
            return;
        }
        if self.flags.numbers_only && !c.is_ascii_digit() {
            return;
        }
        self.text.push(c);
    }

    /// What the renderer shows.
    pub fn display_text(&self) -> String {
        if self.flags.password {
            "*".repeat(self.text.chars().count())
        } else {
            self.text.clone()
        }
    }

    /// The text parsed as an integer, if it is one.
    pub fn number(&self) -> Option<i64> {
        self.text.parse().ok()
    }
}

impl Default for GuiTextInput {
    fn default() -> Self {
        Self {
            text: String::new(),
            flags: TextInputFlags::default(),
            color: Color::WHITE,
            text_color: Color::BLACK,
            font_size: 16,
        }
    }
}

/// Horizontal slider. `value` is the knob position normalised to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuiSlider {
    pub value: f32,
    pub color: Color,
    pub knob_color: Color,
}

impl GuiSlider {
    /// Width of the knob as a fraction of the slider width.
    pub const KNOB_FRACTION: f32 = 0.05;

    /// Move the knob to `x` pixels from the slider's left edge.
    pub fn set_knob_x(&mut self, x: f32, width: f32) {
        if width > 0.0 {
            self.value = (x / width).clamp(0.0, 1.0);
        }
    }

    pub fn knob_rect(&self, rect: Rect) -> Rect {
        let knob_w = rect.width() * Self::KNOB_FRACTION;
        let x = rect.min.x + (rect.width() - knob_w) * self.value;
        Rect::new(Vec2::new(x, rect.min.y), Vec2::new(x + knob_w, rect.max.y))
    }
}

impl Default for GuiSlider {
    fn default() -> Self {
        Self {
            value: 0.0,
            color: Color::GRAY,
            knob_color: Color::WHITE,
        }
    }
}

/// Plain background rect. Not pickable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuiPanel {
    pub color: Color,
    pub transparent: bool,
}

impl Default for GuiPanel {
    fn default() -> Self {
        Self {
            color: Color::GRAY,
            transparent: false,
        }
    }
}

/// Text label. Not pickable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiText {
    pub text: String,
    pub color: Color,
    pub font_size: u32,
}

impl GuiText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

impl Default for GuiText {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: Color::BLACK,
            font_size: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn button_click_invokes_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let mut button = GuiButton::default().on_click(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        button.click();
        button.click();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(format!("{button:?}").contains("callback: true"));
    }

    #[test]
    fn numbers_only_filters_and_backspace_deletes() {
        let mut input = GuiTextInput::default().with_flags(TextInputFlags {
            numbers_only: true,
            ..Default::default()
        });
        for c in ['4', 'x', '2', '\n', '7'] {
            input.type_char(c);
        }
        assert_eq!(input.text, "427");
        input.type_char(BACKSPACE);
        assert_eq!(input.number(), Some(42));
    }

    #[test]
    fn password_masks_display() {
        let mut input = GuiTextInput::default().with_flags(TextInputFlags {
            password: true,
            ..Default::default()
        });
        input.type_char('a');
        input.type_char('b');
        assert_eq!(input.display_text(), "**");
        assert_eq!(input.text, "ab");
    }

    #[test]
    fn slider_value_is_clamped() {
        let mut slider = GuiSlider::default();
        slider.set_knob_x(50.0, 200.0);
        assert_eq!(slider.value, 0.25);
        slider.set_knob_x(500.0, 200.0);
        assert_eq!(slider.value, 1.0);
        let knob = slider.knob_rect(Rect::new(Vec2::ZERO, Vec2::new(200.0, 10.0)));
        assert_eq!(knob.max.x, 200.0);
    }
}
