//! # GUI: Constraint Layout and Picked Widgets
//!
//! A GUI tree is an ordinary entity hierarchy rooted at an entity carrying
//! [`GuiContainer`]. Each widget entity has a [`RectTransform`] plus one widget
//! component. Every frame the scene:
//!
//! 1. resolves rects top-down from the container ([`update_gui_layout`]),
//! 2. dispatches pointer/keyboard input against last frame's picking buffer
//!    ([`GuiDispatch`]),
//! 3. draws the tree ([`render_gui`]) and writes widget ids into the picking
//!    buffer ([`render_gui_picking`]).

pub mod dispatch;
pub mod layout;
pub mod rect;
pub mod widgets;

pub use dispatch::GuiDispatch;
pub use layout::{render_gui, render_gui_picking, update_gui_layout};
pub use rect::{Constraint, ConstraintKind, RectTransform};
pub use widgets::{
    GuiButton, GuiCheckBox, GuiContainer, GuiPanel, GuiSlider, GuiText, GuiTextInput, TextInputFlags,
};
