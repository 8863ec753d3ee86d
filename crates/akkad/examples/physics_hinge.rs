//! Physics Hinge: a motorised wheel pinned to a falling chassis.
//!
//! A static ground box, a dynamic chassis and a circular wheel joined by a
//! motor-driven hinge. Runs two simulated seconds and logs the poses.
//!
//! Run with: `RUST_LOG=info cargo run -p akkad --example physics_hinge --features physics2d`

use std::time::Duration;

use akkad::prelude::*;

fn main() -> akkad::Result<()> {
    env_logger::init();

    let mut scene = Scene::with_rapier(SceneConfig::default().with_gravity(0.0, -9.81));
    let mut ctx = EngineContext::new();
    let mut renderer = CommandRecorder::new();

    let ground = scene.add_entity("Ground");
    scene.world_mut().insert(ground, RigidBody2d::fixed());
    scene.world_mut().insert(ground, ColoredSprite { color: Color::GRAY });
    if let Some(t) = scene.world_mut().get_mut::<Transform>(ground) {
        *t = Transform::from_xy(0.0, -2.0).with_size(20.0, 1.0);
    }

    let chassis = scene.add_entity("Chassis");
    scene.world_mut().insert(chassis, RigidBody2d::dynamic().with_density(2.0));
    scene.world_mut().insert(chassis, Sprite::new().color(Color::RED));
    if let Some(t) = scene.world_mut().get_mut::<Transform>(chassis) {
        *t = Transform::from_xy(0.0, 2.0).with_size(2.0, 0.5);
    }

    let wheel = scene.add_entity("Wheel");
    scene
        .world_mut()
        .insert(wheel, RigidBody2d::dynamic().with_shape(BodyShape2d::Circle).with_friction(0.9));
    scene.world_mut().insert(wheel, Sprite::new().color(Color::BLACK));
    if let Some(t) = scene.world_mut().get_mut::<Transform>(wheel) {
        *t = Transform::from_xy(0.8, 1.6).with_scale(0.6);
    }
    scene.world_mut().insert(
        wheel,
        HingeJoint2d::new(chassis, wheel)
            .with_anchors(Vec2::new(0.8, -0.4), Vec2::ZERO)
            .with_motor(-6.0, 50.0),
    );

    scene.start(&ctx);
    for frame in 0..120 {
        ctx.time.advance(Duration::from_millis(16));
        scene.frame(&ctx, &mut renderer);
        ctx.input.end_frame();

        if frame % 30 == 0 {
            let world = scene.world();
            for e in [chassis, wheel] {
                if let (Some(tag), Some(t)) = (world.get::<Tag>(e), world.get::<Transform>(e)) {
                    log::info!(
                        "frame {frame}: {} at ({:.2}, {:.2}) angle {:.2}",
                        tag.0,
                        t.translation.x,
                        t.translation.y,
                        t.rotation_z()
                    );
                }
            }
        }
    }
    scene.stop();
    Ok(())
}
