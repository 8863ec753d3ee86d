//! Keyboard, mouse and text input state.
//!
//! [`InputState`] is fed by the platform layer (a winit event loop, an editor
//! viewport, a test) and read by the scene during GUI dispatch and by scripts.
//! Edge state (`just_pressed` / `just_released` / the typed character) lasts
//! one frame; call [`InputState::end_frame`] after the scene update.

use std::collections::HashSet;
use std::hash::Hash;

use crate::math::Vec2;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

/// Tracks the state of a set of inputs (keys or mouse buttons).
///
/// - `pressed`: currently held down
/// - `just_pressed`: pressed this frame (not held last frame)
/// - `just_released`: released this frame
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    /// Returns `true` if the input is currently held down.
    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    /// Returns `true` if the input was pressed this frame.
    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    /// Returns `true` if the input was released this frame.
    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    /// Record a press. Holding an already-held input is not a new edge.
    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Clear per-frame state.
    pub fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mouse cursor position in window coordinates (origin top-left, Y down).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorPosition {
    pub x: f32,
    pub y: f32,
}

impl CursorPosition {
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Keyboard, mouse, cursor and typed-text state for one frame.
#[derive(Default)]
pub struct InputState {
    keys: Input<KeyCode>,
    mouse: Input<MouseButton>,
    cursor: CursorPosition,
    last_char: Option<char>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the key is currently held down.
    pub fn pressed(&self, key: KeyCode) -> bool {
        self.keys.pressed(key)
    }

    /// Returns `true` if the key was pressed this frame.
    pub fn just_pressed(&self, key: KeyCode) -> bool {
        self.keys.just_pressed(key)
    }

    /// Returns `true` if the key was released this frame.
    pub fn just_released(&self, key: KeyCode) -> bool {
        self.keys.just_released(key)
    }

    /// Returns `true` if the mouse button is currently held down.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse.pressed(button)
    }

    /// Returns `true` if the mouse button was pressed this frame.
    pub fn mouse_just_pressed(&self, button: MouseButton) -> bool {
        self.mouse.just_pressed(button)
    }

    /// Returns `true` if the mouse button was released this frame.
    pub fn mouse_just_released(&self, button: MouseButton) -> bool {
        self.mouse.just_released(button)
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    /// The character typed this frame, if any. Backspace arrives as `'\u{8}'`.
    pub fn last_char(&self) -> Option<char> {
        self.last_char
    }

    // ── Platform feed ────────────────────────────────────────────────

    pub fn press_key(&mut self, key: KeyCode) {
        self.keys.press(key);
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys.release(key);
    }

    pub fn press_mouse(&mut self, button: MouseButton) {
        self.mouse.press(button);
    }

    pub fn release_mouse(&mut self, button: MouseButton) {
        self.mouse.release(button);
    }

    pub fn set_cursor(&mut self, x: f32, y: f32) {
        self.cursor = CursorPosition { x, y };
    }

    pub fn type_char(&mut self, c: char) {
        self.last_char = Some(c);
    }

    /// Drop this frame's edges and typed character.
    pub fn end_frame(&mut self) {
        self.keys.clear_just();
        self.mouse.clear_just();
        self.last_char = None;
    }
}
