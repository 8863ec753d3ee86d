//! # Scene Documents: Save and Load
//!
//! A scene is saved as JSON: one record per entity keyed by its tag, with a
//! section per registered component type and the parent's document id.
//!
//! ```json
//! { "entities": [
//!   { "id": 0, "tag": "Player", "components": { "Transform": { ... }, "RigidBody2d": { ... } } },
//!   { "id": 1, "tag": "Sword",  "components": { ... }, "parent": 0 }
//! ] }
//! ```
//!
//! Entities are written in hierarchy pre-order (roots by index, then each
//! child list in sibling order). Loading re-links the hierarchy with
//! [`assign_to_parent`] in document order, so sibling order survives a round
//! trip. Relationship links, parent offsets and engine handles are never
//! written.
//!
//! ```ignore
//! let registry = SceneRegistry::with_builtin();
//! save_scene_to_file(&world, &registry, "level.json")?;
//! let entities = load_scene_from_file(&mut world, &registry, "level.json")?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::ecs::hierarchy::{assign_to_parent, children, roots};
use crate::ecs::{Entity, IgnoreParentTransform, RelationShip, World};
use crate::error::{Result, short_type_name};
use crate::gui::{
    GuiButton, GuiCheckBox, GuiContainer, GuiPanel, GuiSlider, GuiText, GuiTextInput, RectTransform,
};
use crate::math::Transform;
use crate::physics2d::RigidBody2d;
use crate::render2d::{Camera2d, ColoredSprite, LineRenderer, Sprite};

use super::Tag;

// ── SceneRegistry ────────────────────────────────────────────────────────

type SaveFn = fn(&World, Entity) -> Option<serde_json::Value>;
type LoadFn = fn(&mut World, Entity, serde_json::Value) -> Result<()>;

struct ComponentFns {
    save: SaveFn,
    load: LoadFn,
}

/// Maps component names to save/load function pointers.
///
/// Register each component type you want to include in saved scenes.
#[derive(Default)]
pub struct SceneRegistry {
    by_name: BTreeMap<&'static str, ComponentFns>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every serializable engine component.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register::<Transform>();
        registry.register::<IgnoreParentTransform>();
        registry.register::<Sprite>();
        registry.register::<ColoredSprite>();
        registry.register::<LineRenderer>();
        registry.register::<Camera2d>();
        registry.register::<RigidBody2d>();
        registry.register::<GuiContainer>();
        registry.register::<RectTransform>();
        registry.register::<GuiButton>();
        registry.register::<GuiCheckBox>();
        registry.register::<GuiTextInput>();
        registry.register::<GuiSlider>();
        registry.register::<GuiPanel>();
        registry.register::<GuiText>();
        registry
    }

    /// Register a component type under its short type name.
    pub fn register<T>(&mut self)
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let fns = ComponentFns {
            save: |world, entity| {
                let value = world.get::<T>(entity)?;
                serde_json::to_value(value).ok()
            },
            load: |world, entity, json| {
                let value: T = serde_json::from_value(json)?;
                world.insert(entity, value);
                Ok(())
            },
        };
        self.by_name.insert(short_type_name(std::any::type_name::<T>()), fns);
    }

    /// Registered component names, sorted.
    pub fn component_names(&self) -> Vec<&'static str> {
        self.by_name.keys().copied().collect()
    }
}

// ── Scene Data (JSON wire format) ────────────────────────────────────────

/// A serialized scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    pub entities: Vec<SceneEntity>,
}

/// One entity in a serialized scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntity {
    pub id: u32,
    pub tag: String,
    pub components: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
}

// ── Save / Load ──────────────────────────────────────────────────────────

fn preorder(world: &World) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut stack: Vec<Entity> = roots(world);
    stack.reverse();
    while let Some(node) = stack.pop() {
        out.push(node);
        let mut kids: Vec<Entity> = children(world, node).collect();
        kids.reverse();
        stack.extend(kids);
    }
    out
}

/// Save every tagged entity in the world.
pub fn save_scene(world: &World, registry: &SceneRegistry) -> SceneData {
    let mut entities = Vec::new();
    for entity in preorder(world) {
        let Some(tag) = world.get::<Tag>(entity) else {
            continue;
        };
        let components = registry
            .by_name
            .iter()
            .filter_map(|(name, fns)| Some((name.to_string(), (fns.save)(world, entity)?)))
            .collect();
        let parent = world
            .get::<RelationShip>(entity)
            .and_then(RelationShip::parent)
            .filter(|p| world.has::<Tag>(*p))
            .map(Entity::index);
        entities.push(SceneEntity {
            id: entity.index(),
            tag: tag.0.clone(),
            components,
            parent,
        });
    }
    SceneData { entities }
}

/// Spawn the entities of `data` into the world and rebuild their hierarchy.
///
/// Unknown component names are skipped with a warning. Returns the spawned
/// entities in document order. On error every entity spawned so far is
/// despawned again, leaving the world as it was.
pub fn load_scene(world: &mut World, registry: &SceneRegistry, data: &SceneData) -> Result<Vec<Entity>> {
    let mut spawned = Vec::with_capacity(data.entities.len());
    match load_into(world, registry, data, &mut spawned) {
        Ok(()) => Ok(spawned),
        Err(err) => {
            log::error!("scene load failed, rolling back {} entities: {err}", spawned.len());
            for entity in spawned {
                world.despawn(entity);
            }
            Err(err)
        }
    }
}

fn load_into(
    world: &mut World,
    registry: &SceneRegistry,
    data: &SceneData,
    spawned: &mut Vec<Entity>,
) -> Result<()> {
    let mut id_map: HashMap<u32, Entity> = HashMap::new();

    for scene_entity in &data.entities {
        let entity = world.spawn((Tag::new(scene_entity.tag.clone()), RelationShip::new()));
        id_map.insert(scene_entity.id, entity);
        spawned.push(entity);

        for (name, json) in &scene_entity.components {
            match registry.by_name.get(name.as_str()) {
                Some(fns) => (fns.load)(world, entity, json.clone())?,
                None => log::warn!("unknown component `{name}` on `{}`", scene_entity.tag),
            }
        }
    }

    for (scene_entity, &child) in data.entities.iter().zip(spawned.iter()) {
        let Some(parent_id) = scene_entity.parent else {
            continue;
        };
        match id_map.get(&parent_id) {
            Some(&parent) => assign_to_parent(world, Some(parent), child)?,
            None => log::warn!("`{}` refers to missing parent {parent_id}", scene_entity.tag),
        }
    }
    Ok(())
}

/// Save the world to a pretty-printed JSON file.
pub fn save_scene_to_file(world: &World, registry: &SceneRegistry, path: impl AsRef<Path>) -> Result<()> {
    let data = save_scene(world, registry);
    let json = serde_json::to_string_pretty(&data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load entities from a JSON file.
pub fn load_scene_from_file(
    world: &mut World,
    registry: &SceneRegistry,
    path: impl AsRef<Path>,
) -> Result<Vec<Entity>> {
    let json = std::fs::read_to_string(path)?;
    let data: SceneData = serde_json::from_str(&json)?;
    load_scene(world, registry, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gui::Constraint;
    use crate::math::Vec3;

    fn tagged(world: &mut World, tag: &str, transform: Transform) -> Entity {
        world.spawn((Tag::new(tag), RelationShip::new(), transform))
    }

    #[test]
    fn round_trip_keeps_components_and_sibling_order() {
        let registry = SceneRegistry::with_builtin();
        let mut world = World::new();
        let root = tagged(&mut world, "Root", Transform::from_xy(1.0, 2.0));
        let a = tagged(&mut world, "A", Transform::from_xy(3.0, 0.0));
        let b = tagged(&mut world, "B", Transform::default());
        assign_to_parent(&mut world, Some(root), b).unwrap();
        assign_to_parent(&mut world, Some(root), a).unwrap();
        world.insert(a, RigidBody2d::fixed());

        let data = save_scene(&world, &registry);
        let json = serde_json::to_string(&data).unwrap();
        let data: SceneData = serde_json::from_str(&json).unwrap();

        let mut loaded = World::new();
        let entities = load_scene(&mut loaded, &registry, &data).unwrap();
        assert_eq!(entities.len(), 3);

        let root = entities[0];
        assert_eq!(loaded.get::<Tag>(root).unwrap().0, "Root");
        let kids: Vec<String> = children(&loaded, root)
            .map(|c| loaded.get::<Tag>(c).unwrap().0.clone())
            .collect();
        assert_eq!(kids, ["B", "A"]);

        let a = children(&loaded, root).nth(1).unwrap();
        assert_eq!(loaded.get::<Transform>(a).unwrap().translation, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(loaded.get::<RigidBody2d>(a).unwrap().body_type, RigidBody2d::fixed().body_type);
    }

    #[test]
    fn gui_constraints_are_saved() {
        let registry = SceneRegistry::with_builtin();
        let mut world = World::new();
        let e = world.spawn((
            Tag::new("Button"),
            RelationShip::new(),
            RectTransform::new(
                Constraint::pixel(4.0),
                Constraint::center(0.0),
                Constraint::relative(0.2),
                Constraint::aspect(0.5),
            ),
        ));
        let data = save_scene(&world, &registry);
        let section = &data.entities[0].components["RectTransform"];
        assert_eq!(section["height"]["kind"], "ASPECT");

        let mut loaded = World::new();
        let entities = load_scene(&mut loaded, &registry, &data).unwrap();
        assert_eq!(
            loaded.get::<RectTransform>(entities[0]).unwrap().width,
            world.get::<RectTransform>(e).unwrap().width
        );
    }

    #[test]
    fn unknown_sections_and_parents_are_skipped() {
        let registry = SceneRegistry::with_builtin();
        let mut components = BTreeMap::new();
        components.insert("Mystery".to_string(), serde_json::json!({ "x": 1 }));
        let data = SceneData {
            entities: vec![SceneEntity {
                id: 5,
                tag: "Lonely".into(),
                components,
                parent: Some(99),
            }],
        };
        let mut world = World::new();
        let entities = load_scene(&mut world, &registry, &data).unwrap();
        assert!(world.get::<RelationShip>(entities[0]).unwrap().is_root());
    }

    #[test]
    fn malformed_section_is_an_error() {
        let registry = SceneRegistry::with_builtin();
        let mut components = BTreeMap::new();
        components.insert("Transform".to_string(), serde_json::json!("nope"));
        let data = SceneData {
            entities: vec![SceneEntity { id: 0, tag: "Bad".into(), components, parent: None }],
        };
        assert!(load_scene(&mut World::new(), &registry, &data).is_err());
    }

    #[test]
    fn failed_load_leaves_the_world_untouched() {
        let registry = SceneRegistry::with_builtin();
        let good = SceneEntity {
            id: 0,
            tag: "Good".into(),
            components: BTreeMap::from([(
                "Transform".to_string(),
                serde_json::to_value(Transform::from_xy(1.0, 2.0)).unwrap(),
            )]),
            parent: None,
        };
        let bad = SceneEntity {
            id: 1,
            tag: "Bad".into(),
            components: BTreeMap::from([("Transform".to_string(), serde_json::json!("nope"))]),
            parent: Some(0),
        };
        let data = SceneData { entities: vec![good, bad] };

        let mut world = World::new();
        let keeper = tagged(&mut world, "Keeper", Transform::IDENTITY);
        assert!(load_scene(&mut world, &registry, &data).is_err());
        assert_eq!(world.entity_count(), 1);
        assert!(world.is_alive(keeper));
        assert_eq!(roots(&world), vec![keeper]);
    }

    #[test]
    fn parent_cycle_rolls_back_the_whole_load() {
        let registry = SceneRegistry::with_builtin();
        let entity = |id, parent| SceneEntity {
            id,
            tag: format!("Loop{id}"),
            components: BTreeMap::new(),
            parent: Some(parent),
        };
        let data = SceneData { entities: vec![entity(0, 1), entity(1, 0)] };
        let mut world = World::new();
        assert!(load_scene(&mut world, &registry, &data).is_err());
        assert_eq!(world.entity_count(), 0);
    }
}
