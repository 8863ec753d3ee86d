//! GUI layout and the two GUI draw passes.
//!
//! Layout walks the tree under the container top-down, so a parent's rect is
//! always resolved before its children read it. Both draw passes visit nodes
//! in pre-order (a node, then its subtree, then its next sibling), so later
//! siblings draw over earlier ones in colour and in the picking buffer alike.

use crate::ecs::hierarchy::children;
use crate::ecs::{Entity, World};
use crate::math::Rect;
use crate::picking::PickingBuffer;
use crate::render2d::Renderer2d;

use super::rect::RectTransform;
use super::widgets::{GuiButton, GuiCheckBox, GuiContainer, GuiPanel, GuiSlider, GuiText, GuiTextInput};

/// Entities under `container` in pre-order, container excluded.
pub fn draw_order(world: &World, container: Entity) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut stack: Vec<Entity> = children(world, container).collect();
    stack.reverse();
    let limit = world.entity_count();
    while let Some(node) = stack.pop() {
        if out.len() >= limit {
            break;
        }
        out.push(node);
        let mut kids: Vec<Entity> = children(world, node).collect();
        kids.reverse();
        stack.extend(kids);
    }
    out
}

/// Resolve every `RectTransform` under `container` against the screen size.
///
/// A node whose parent has no `RectTransform` lays out against the whole
/// screen.
pub fn update_gui_layout(world: &mut World, container: Entity, screen_size: crate::math::Vec2) {
    let Some(root) = world.get_mut::<GuiContainer>(container) else {
        log::warn!("{container:?} is not a GUI container");
        return;
    };
    root.screen_size = screen_size;
    let screen = root.rect();

    let mut queue = vec![(container, screen)];
    while let Some((parent, parent_rect)) = queue.pop() {
        for child in children(world, parent).collect::<Vec<_>>() {
            let rect = match world.get_mut::<RectTransform>(child) {
                Some(rt) => rt.resolve(parent_rect),
                None => screen,
            };
            queue.push((child, rect));
        }
    }
}

/// Whether picking a widget of this entity means anything.
pub fn is_pickable_widget(world: &World, entity: Entity) -> bool {
    world.has::<GuiButton>(entity)
        || world.has::<GuiCheckBox>(entity)
        || world.has::<GuiTextInput>(entity)
        || world.has::<GuiSlider>(entity)
}

/// Draw the GUI tree in pixel space.
pub fn render_gui(world: &World, container: Entity, renderer: &mut dyn Renderer2d) {
    let Some(root) = world.get::<GuiContainer>(container) else {
        return;
    };
    let projection = root.projection();

    for entity in draw_order(world, container) {
        let Some(rect) = world.get::<RectTransform>(entity).map(RectTransform::rect) else {
            continue;
        };
        if let Some(panel) = world.get::<GuiPanel>(entity) {
            if !panel.transparent {
                renderer.draw_rect(rect, panel.color, &projection);
            }
        }
        if let Some(button) = world.get::<GuiButton>(entity) {
            renderer.draw_rect(rect, button.color, &projection);
        }
        if let Some(checkbox) = world.get::<GuiCheckBox>(entity) {
            renderer.draw_rect(rect, checkbox.box_color, &projection);
            if checkbox.checked {
                renderer.draw_rect(checkbox.mark_rect(rect), checkbox.mark_color, &projection);
            }
        }
        if let Some(input) = world.get::<GuiTextInput>(entity) {
            renderer.draw_rect(rect, input.color, &projection);
            renderer.render_text(&input.display_text(), rect, input.text_color, input.font_size, &projection);
        }
        if let Some(slider) = world.get::<GuiSlider>(entity) {
            renderer.draw_rect(rect, slider.color, &projection);
            renderer.draw_rect(slider.knob_rect(rect), slider.knob_color, &projection);
        }
        if let Some(text) = world.get::<GuiText>(entity) {
            renderer.render_text(&text.text, rect, text.color, text.font_size, &projection);
        }
    }
}

/// Write the ids of pickable widgets into the buffer.
pub fn render_gui_picking(world: &World, container: Entity, buffer: &mut PickingBuffer) {
    for entity in draw_order(world, container) {
        if !is_pickable_widget(world, entity) {
            continue;
        }
        if let Some(rt) = world.get::<RectTransform>(entity) {
            let rect: Rect = rt.rect();
            buffer.fill_rect(rect, entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::RelationShip;
    use crate::ecs::hierarchy::assign_to_parent;
    use crate::gui::Constraint;
    use crate::math::{UVec2, Vec2};
    use crate::render2d::{CommandRecorder, DrawCommand};

    fn gui_tree() -> (World, Entity, Entity, Entity) {
        let mut world = World::new();
        let container = world.spawn((GuiContainer::default(), RelationShip::new()));
        let panel = world.spawn((
            RelationShip::new(),
            GuiPanel::default(),
            RectTransform::new(
                Constraint::pixel(0.0),
                Constraint::pixel(0.0),
                Constraint::relative(0.5),
                Constraint::relative(0.5),
            ),
        ));
        let button = world.spawn((
            RelationShip::new(),
            GuiButton::default(),
            RectTransform::new(
                Constraint::pixel(10.0),
                Constraint::pixel(10.0),
                Constraint::pixel(100.0),
                Constraint::aspect(0.5),
            ),
        ));
        assign_to_parent(&mut world, Some(container), panel).unwrap();
        assign_to_parent(&mut world, Some(panel), button).unwrap();
        (world, container, panel, button)
    }

    #[test]
    fn children_resolve_inside_parent() {
        let (mut world, container, panel, button) = gui_tree();
        update_gui_layout(&mut world, container, Vec2::new(400.0, 200.0));
        assert_eq!(
            world.get::<RectTransform>(panel).unwrap().rect(),
            Rect::new(Vec2::ZERO, Vec2::new(200.0, 100.0))
        );
        assert_eq!(
            world.get::<RectTransform>(button).unwrap().rect(),
            Rect::new(Vec2::new(10.0, 10.0), Vec2::new(110.0, 60.0))
        );
    }

    #[test]
    fn layout_follows_screen_resize() {
        let (mut world, container, panel, _) = gui_tree();
        update_gui_layout(&mut world, container, Vec2::new(400.0, 200.0));
        update_gui_layout(&mut world, container, Vec2::new(800.0, 800.0));
        assert_eq!(world.get::<RectTransform>(panel).unwrap().rect().size(), Vec2::new(400.0, 400.0));
        assert_eq!(world.get::<GuiContainer>(container).unwrap().screen_size, Vec2::new(800.0, 800.0));
    }

    #[test]
    fn only_widgets_reach_the_picking_buffer() {
        let (mut world, container, _, button) = gui_tree();
        update_gui_layout(&mut world, container, Vec2::new(400.0, 200.0));
        let mut buffer = PickingBuffer::new(400, 200);
        render_gui_picking(&world, container, &mut buffer);
        assert_eq!(buffer.read(20, 20), Some(button.index()));
        assert_eq!(buffer.read(150, 80), None);
        assert!(crate::picking::pick(&world, &buffer, UVec2::new(20, 20)).is_some());
    }

    #[test]
    fn colour_pass_draws_in_pre_order() {
        let (mut world, container, _, _) = gui_tree();
        update_gui_layout(&mut world, container, Vec2::new(400.0, 200.0));
        let mut recorder = CommandRecorder::new();
        render_gui(&world, container, &mut recorder);
        let rects: Vec<Rect> = recorder
            .take()
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Rect { rect, .. } => Some(rect),
                _ => None,
            })
            .collect();
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].size(), Vec2::new(200.0, 100.0));
    }
}
