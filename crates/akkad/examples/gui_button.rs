//! GUI Button: layout, picking and click dispatch without a window.
//!
//! Builds a centered panel with a button, a checkbox and a text field, then
//! feeds scripted pointer and keyboard input through a headless frame loop.
//!
//! Run with: `RUST_LOG=info cargo run -p akkad --example gui_button`

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use akkad::prelude::*;

fn main() -> akkad::Result<()> {
    env_logger::init();

    let mut scene = Scene::new(SceneConfig::default().with_viewport_size(640.0, 480.0));
    let mut ctx = EngineContext::new();
    let mut renderer = CommandRecorder::new();

    // ── Widgets ──────────────────────────────────────────────────────────

    let panel = scene.add_gui_element("Panel", None)?;
    scene.world_mut().insert(panel, GuiPanel::default());
    scene.world_mut().insert(
        panel,
        RectTransform::new(
            Constraint::center(0.0),
            Constraint::center(0.0),
            Constraint::relative(0.6),
            Constraint::relative(0.8),
        ),
    );

    let clicks = Arc::new(AtomicU32::new(0));
    let counter = clicks.clone();
    let button = scene.add_gui_element("Play", Some(panel))?;
    scene.world_mut().insert(
        button,
        GuiButton::new(Color::GREEN).on_click(move || {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            log::info!("play clicked ({n})");
        }),
    );
    scene.world_mut().insert(
        button,
        RectTransform::new(
            Constraint::center(0.0),
            Constraint::relative(0.7),
            Constraint::relative(0.5),
            Constraint::pixel(48.0),
        ),
    );

    let checkbox = scene.add_gui_element("Fullscreen", Some(panel))?;
    scene.world_mut().insert(checkbox, GuiCheckBox::default());
    scene.world_mut().insert(
        checkbox,
        RectTransform::new(
            Constraint::center(0.0),
            Constraint::relative(0.45),
            Constraint::pixel(32.0),
            Constraint::aspect(1.0),
        ),
    );

    let name = scene.add_gui_element("Name", Some(panel))?;
    scene.world_mut().insert(name, GuiTextInput::default());
    scene.world_mut().insert(
        name,
        RectTransform::new(
            Constraint::center(0.0),
            Constraint::relative(0.2),
            Constraint::relative(0.8),
            Constraint::pixel(32.0),
        ),
    );

    // ── Frame loop ───────────────────────────────────────────────────────

    let mut frame = |scene: &mut Scene, ctx: &mut EngineContext| {
        ctx.time.advance(Duration::from_millis(16));
        scene.frame(ctx, &mut renderer);
        ctx.input.end_frame();
    };

    frame(&mut scene, &mut ctx);

    for widget in [button, checkbox, name] {
        let Some(rect) = scene.world().get::<RectTransform>(widget).map(RectTransform::rect) else {
            continue;
        };
        // GUI space is bottom-left origin, window space top-left.
        let center = rect.center();
        ctx.input.set_cursor(center.x, 480.0 - center.y);
        ctx.input.press_mouse(MouseButton::Left);
        frame(&mut scene, &mut ctx);
        ctx.input.release_mouse(MouseButton::Left);
        frame(&mut scene, &mut ctx);
    }

    for c in "akkad".chars() {
        ctx.input.type_char(c);
        frame(&mut scene, &mut ctx);
    }

    let world = scene.world();
    log::info!(
        "clicks: {}, fullscreen: {}, name: {:?}",
        clicks.load(Ordering::Relaxed),
        world.get::<GuiCheckBox>(checkbox).is_some_and(|c| c.checked),
        world.get::<GuiTextInput>(name).map(|t| t.text.as_str()).unwrap_or_default(),
    );
    Ok(())
}
