//! Scene Save/Load: round-trip a small hierarchy through a JSON file.
//!
//! Builds a scene with a camera, a parent sprite and two children, saves it
//! to the temp directory, loads it into a fresh scene and prints the result.
//!
//! Run with: `RUST_LOG=debug cargo run -p akkad --example scene_save_load`

use akkad::ecs::hierarchy::{children, roots};
use akkad::prelude::*;
use akkad::scene::serialize::{load_scene_from_file, save_scene_to_file};

fn main() -> akkad::Result<()> {
    env_logger::init();

    let path = std::env::temp_dir().join("akkad_scene.json");

    let mut scene = Scene::default();
    let camera = scene.add_entity("Camera");
    scene.world_mut().insert(camera, Camera2d::default());

    let ship = scene.add_entity("Ship");
    scene.world_mut().insert(ship, Sprite::new().color(Color::BLUE));
    if let Some(t) = scene.world_mut().get_mut::<Transform>(ship) {
        *t = Transform::from_xy(2.0, 1.0).with_rotation_z(0.5);
    }

    for (tag, x) in [("LeftWing", -1.0), ("RightWing", 1.0)] {
        let wing = scene.add_entity(tag);
        scene.world_mut().insert(wing, Sprite::new().color(Color::GRAY));
        if let Some(t) = scene.world_mut().get_mut::<Transform>(wing) {
            t.translation.x = x;
        }
        scene.assign_to_parent(Some(ship), wing)?;
    }

    save_scene_to_file(scene.world(), scene.registry(), &path)?;
    log::info!("saved {} entities to {}", scene.world().entity_count(), path.display());

    let mut restored = Scene::default();
    load_scene_from_file(restored.world_mut(), scene.registry(), &path)?;
    akkad::ecs::propagate_transforms(restored.world_mut());

    let world = restored.world();
    for root in roots(world) {
        print_tree(world, root, 0);
    }
    Ok(())
}

fn print_tree(world: &World, entity: Entity, depth: usize) {
    let tag = world.get::<Tag>(entity).map(|t| t.0.as_str()).unwrap_or("?");
    let pos = world
        .get::<Transform>(entity)
        .map(Transform::world_translation)
        .unwrap_or(Vec3::ZERO);
    println!("{:indent$}{tag} at ({:.2}, {:.2})", "", pos.x, pos.y, indent = depth * 2);
    for child in children(world, entity) {
        print_tree(world, child, depth + 1);
    }
}
