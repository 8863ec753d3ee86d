//! # Scene: the Per-Frame Pipeline
//!
//! A [`Scene`] owns the [`World`], the physics engine, the picking buffer,
//! the destruction queue and the GUI focus state. The host drives it once per
//! frame with an [`EngineContext`] and a [`Renderer2d`]:
//!
//! ```text
//!  update ─┬─ physics step ──▶ pose sync            (running only)
//!          ├─ transform propagation
//!          ├─ destruction sweep
//!          ├─ GUI layout ──▶ pointer/keyboard dispatch (reads last picking pass)
//!          └─ script start/update callbacks          (running only)
//!  render ──── sprites by sorting layer, lines, GUI
//!  render_picking ── sprite ids, then widget ids
//! ```
//!
//! `start` creates physics bodies and joints and starts scripts. `stop` tears
//! them down again and releases every script instance, so a scene can be
//! started, stopped and started again.

pub mod destroy;
pub mod serialize;

use serde::{Deserialize, Serialize};

use crate::asset::AssetRegistry;
use crate::config::SceneConfig;
use crate::context::EngineContext;
use crate::ecs::hierarchy::{self, descendants, propagate_transforms};
use crate::ecs::{Entity, RelationShip, World};
use crate::error::{AkkadError, Result};
use crate::gui::{GuiContainer, GuiDispatch, RectTransform, render_gui, render_gui_picking, update_gui_layout};
use crate::math::{Mat4, Rect, Transform, Vec2};
use crate::physics2d::{self, HingeJoint2d, NullPhysics2d, PhysicsEngine2d};
use crate::picking::{self, PickingBuffer};
use crate::render2d::{Camera2d, ColoredSprite, LineRenderer, Renderer2d, Sprite};
use crate::script::{self, Callback, ScriptComponent, ScriptEnv};

use self::destroy::DestructionQueue;
use self::serialize::{SceneData, SceneRegistry, load_scene, save_scene};

/// Name of an entity. Scene documents and [`Scene::entity_by_tag`] key on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::new("Entity")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneState {
    #[default]
    Stopped,
    Running,
}

pub struct Scene {
    world: World,
    physics: Box<dyn PhysicsEngine2d>,
    config: SceneConfig,
    registry: SceneRegistry,
    picking: PickingBuffer,
    /// Scene rectangle in window coordinates.
    viewport: Rect,
    destroy_queue: DestructionQueue,
    gui: GuiDispatch,
    state: SceneState,
    frame: u64,
    destroyed_last_sweep: usize,
    script_faults: usize,
}

impl Scene {
    /// A scene with the [`NullPhysics2d`] engine.
    pub fn new(config: SceneConfig) -> Self {
        Self::with_physics(config, Box::new(NullPhysics2d::new()))
    }

    pub fn with_physics(config: SceneConfig, physics: Box<dyn PhysicsEngine2d>) -> Self {
        let size = config.viewport_size;
        Self {
            world: World::new(),
            physics,
            registry: SceneRegistry::with_builtin(),
            picking: PickingBuffer::new(size.x as u32, size.y as u32),
            viewport: Rect::from_pos_size(Vec2::ZERO, size),
            destroy_queue: DestructionQueue::new(),
            gui: GuiDispatch::new(),
            state: SceneState::Stopped,
            frame: 0,
            destroyed_last_sweep: 0,
            script_faults: 0,
            config,
        }
    }

    /// A scene driven by rapier2d, configured from `config`.
    #[cfg(feature = "physics2d")]
    pub fn with_rapier(config: SceneConfig) -> Self {
        let engine = physics2d::RapierPhysics2d::from_config(&config);
        Self::with_physics(config, Box::new(engine))
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn physics(&self) -> &dyn PhysicsEngine2d {
        self.physics.as_ref()
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SceneRegistry {
        &mut self.registry
    }

    pub fn picking_buffer(&self) -> &PickingBuffer {
        &self.picking
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SceneState::Running
    }

    /// Frames updated since the scene was created.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// The text input holding keyboard focus.
    pub fn focused(&self) -> Option<Entity> {
        self.gui.focused()
    }

    pub fn pending_destruction(&self) -> usize {
        self.destroy_queue.len()
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Spawn an entity with `Tag`, `Transform` and `RelationShip`.
    pub fn add_entity(&mut self, tag: impl Into<String>) -> Entity {
        self.world
            .spawn((Tag::new(tag), Transform::default(), RelationShip::new()))
    }

    /// First entity (lowest index) with the given tag.
    pub fn entity_by_tag(&self, tag: &str) -> Option<Entity> {
        let mut tagged = self.world.entities_with::<Tag>();
        tagged.sort_unstable();
        tagged
            .into_iter()
            .find(|e| self.world.get::<Tag>(*e).is_some_and(|t| t.0 == tag))
    }

    pub fn assign_to_parent(&mut self, parent: Option<Entity>, child: Entity) -> Result<()> {
        hierarchy::assign_to_parent(&mut self.world, parent, child)
    }

    /// Queue `entity` for the next destruction sweep. Returns `false` if it
    /// is dead or already queued.
    pub fn mark_for_destruction(&mut self, entity: Entity) -> bool {
        self.world.is_alive(entity) && self.destroy_queue.mark(entity)
    }

    /// Queue `entity` and its whole subtree.
    pub fn mark_for_destruction_recursive(&mut self, entity: Entity) -> usize {
        let subtree = if self.world.has::<RelationShip>(entity) {
            descendants(&self.world, entity)
        } else {
            vec![entity]
        };
        subtree
            .into_iter()
            .filter(|e| self.mark_for_destruction(*e))
            .count()
    }

    /// Spawn an instantiable-entity template from the asset registry and
    /// return its root.
    ///
    /// On a running scene the new bodies and joints are created at once.
    pub fn instantiate(&mut self, name: &str, assets: &mut AssetRegistry) -> Result<Entity> {
        self.spawn_template(name, None, assets)
    }

    /// Like [`Scene::instantiate`], with the root placed at `transform`
    /// before any body is created.
    pub fn instantiate_at(
        &mut self,
        name: &str,
        transform: Transform,
        assets: &mut AssetRegistry,
    ) -> Result<Entity> {
        self.spawn_template(name, Some(transform), assets)
    }

    fn spawn_template(
        &mut self,
        name: &str,
        pose: Option<Transform>,
        assets: &mut AssetRegistry,
    ) -> Result<Entity> {
        let data = match assets.template(name) {
            Ok(data) => data.clone(),
            Err(err) => {
                log::error!("cannot instantiate `{name}`: {err}");
                return Err(err);
            }
        };
        let spawned = load_scene(&mut self.world, &self.registry, &data)?;
        let Some(root) = spawned
            .iter()
            .copied()
            .find(|e| self.world.get::<RelationShip>(*e).is_some_and(RelationShip::is_root))
        else {
            for entity in spawned {
                self.world.despawn(entity);
            }
            return Err(AkkadError::AssetResolution(format!("template `{name}` has no root entity")));
        };
        if let Some(pose) = pose {
            self.world.insert(root, pose);
        }

        if self.is_running() {
            propagate_transforms(&mut self.world);
            for &entity in &spawned {
                physics2d::init_body(&mut self.world, self.physics.as_mut(), entity);
            }
            let joints: Vec<Entity> = spawned
                .iter()
                .copied()
                .filter(|e| self.world.has::<HingeJoint2d>(*e))
                .collect();
            for entity in joints {
                if let Err(err) = physics2d::init_joint(&mut self.world, self.physics.as_mut(), entity) {
                    log::warn!("{err}");
                }
            }
        }
        Ok(root)
    }

    pub fn save(&self) -> SceneData {
        save_scene(&self.world, &self.registry)
    }

    pub fn load(&mut self, data: &SceneData) -> Result<Vec<Entity>> {
        load_scene(&mut self.world, &self.registry, data)
    }

    // ── GUI ──────────────────────────────────────────────────────────

    /// The GUI root (lowest index if several exist).
    pub fn gui_container(&self) -> Option<Entity> {
        let mut containers = self.world.entities_with::<GuiContainer>();
        containers.sort_unstable();
        containers.first().copied()
    }

    /// The GUI root, created if missing.
    pub fn add_gui_container(&mut self) -> Entity {
        if let Some(container) = self.gui_container() {
            return container;
        }
        self.world.spawn((
            Tag::new("GUI Container"),
            GuiContainer::new(self.config.viewport_size),
            RelationShip::new(),
        ))
    }

    /// Spawn a GUI node with a default `RectTransform` under `parent`, or
    /// under the GUI root when `parent` is `None`.
    pub fn add_gui_element(&mut self, tag: impl Into<String>, parent: Option<Entity>) -> Result<Entity> {
        let parent = match parent {
            Some(parent) => parent,
            None => self.add_gui_container(),
        };
        let entity = self
            .world
            .spawn((Tag::new(tag), RelationShip::new(), RectTransform::default()));
        hierarchy::assign_to_parent(&mut self.world, Some(parent), entity)?;
        Ok(entity)
    }

    // ── Viewport & picking ───────────────────────────────────────────

    /// Place the scene in the window. Resizes the picking buffer and the GUI
    /// screen.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.config.viewport_size = viewport.size();
        self.picking
            .resize(viewport.width().max(0.0) as u32, viewport.height().max(0.0) as u32);
    }

    /// Entity under a window-space cursor position, from the last picking
    /// pass.
    pub fn pick(&self, cursor: Vec2) -> Option<Entity> {
        let at = picking::cursor_to_buffer(cursor, self.viewport, self.picking.size().y)?;
        picking::pick(&self.world, &self.picking, at)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Create bodies and joints and start scripts.
    pub fn start(&mut self, ctx: &EngineContext) {
        if self.is_running() {
            return;
        }
        self.state = SceneState::Running;
        propagate_transforms(&mut self.world);
        let bodies = physics2d::init_bodies(&mut self.world, self.physics.as_mut());
        let joints = physics2d::init_joints(&mut self.world, self.physics.as_mut());
        log::info!("scene started: {bodies} bodies, {joints} joints");

        let mut env = ScriptEnv {
            input: &ctx.input,
            time: &ctx.time,
            destroy_queue: &mut self.destroy_queue,
        };
        self.script_faults = script::run_all(&mut self.world, &mut env, Callback::Start);
    }

    /// Destroy every body and joint and release every script.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        physics2d::teardown(&mut self.world, self.physics.as_mut());
        script::release_all(&mut self.world);
        self.gui.reset();
        self.state = SceneState::Stopped;
        log::info!("scene stopped after {} frames", self.frame);
    }

    // ── Frame ────────────────────────────────────────────────────────

    /// Run the update half of a frame.
    pub fn update(&mut self, ctx: &EngineContext) {
        self.frame += 1;
        let running = self.is_running();

        if running {
            self.physics.step(ctx.time.delta_secs());
            physics2d::sync_poses(&mut self.world, self.physics.as_ref());
        }
        propagate_transforms(&mut self.world);
        self.destroyed_last_sweep = self.sweep_destroyed();

        match self.gui_container() {
            Some(container) => {
                update_gui_layout(&mut self.world, container, self.config.viewport_size);
                self.gui
                    .dispatch(&mut self.world, &ctx.input, &self.picking, self.viewport);
            }
            None => self.gui.reset(),
        }

        if running {
            physics2d::init_bodies(&mut self.world, self.physics.as_mut());
            physics2d::init_pending_joints(&mut self.world, self.physics.as_mut());
            let mut env = ScriptEnv {
                input: &ctx.input,
                time: &ctx.time,
                destroy_queue: &mut self.destroy_queue,
            };
            self.script_faults = script::run_all(&mut self.world, &mut env, Callback::Start)
                + script::run_all(&mut self.world, &mut env, Callback::Update);
        }
    }

    /// Destroy everything marked since the last sweep. Entities marked while
    /// the sweep runs wait for the next one.
    fn sweep_destroyed(&mut self) -> usize {
        let batch = self.destroy_queue.take_batch();
        let mut destroyed = 0;
        for entity in batch {
            if !self.world.is_alive(entity) {
                continue;
            }
            physics2d::destroy_body(&mut self.world, self.physics.as_mut(), entity);
            if let Some(script) = self.world.get_mut::<ScriptComponent>(entity) {
                script.release();
            }
            if self.world.has::<RelationShip>(entity) {
                if let Err(err) = hierarchy::remove_from_hierarchy(&mut self.world, entity) {
                    log::warn!("{err}");
                }
            }
            self.world.despawn(entity);
            destroyed += 1;
        }
        if destroyed > 0 {
            log::debug!("destroyed {destroyed} entities");
        }
        destroyed
    }

    /// View-projection of the first active camera, or of a default camera
    /// at the origin.
    pub fn view_projection(&self) -> Mat4 {
        let size = self.config.viewport_size;
        let aspect = if size.y > 0.0 { size.x / size.y } else { 1.0 };
        let view = self.world.view::<(Camera2d, Transform)>();
        let mut cameras: Vec<Entity> = view.iter().collect();
        cameras.sort_unstable();
        cameras
            .into_iter()
            .filter_map(|e| Some((view.get::<Camera2d>(e)?, view.get::<Transform>(e)?)))
            .find(|(camera, _)| camera.active)
            .map(|(camera, transform)| camera.view_projection(transform, aspect))
            .unwrap_or_else(|| Camera2d::default().view_projection(&Transform::IDENTITY, aspect))
    }

    /// Sprites in `layer` with their world matrices, by entity index.
    fn sprites_in_layer(&self, layer: &str) -> Vec<(Entity, Mat4)> {
        let view = self.world.view::<(Sprite, Transform)>();
        let mut out: Vec<(Entity, Mat4)> = view
            .iter()
            .filter_map(|e| {
                let sprite = view.get::<Sprite>(e)?;
                if sprite.sorting_layer != layer {
                    return None;
                }
                Some((e, view.get::<Transform>(e)?.matrix()))
            })
            .collect();
        out.sort_unstable_by_key(|(e, _)| *e);
        out
    }

    /// Draw the scene and its GUI.
    pub fn render(&mut self, ctx: &EngineContext, renderer: &mut dyn Renderer2d) {
        renderer.clear();
        renderer.begin_scene(self.view_projection());

        let layers = self.config.sorting_layers.clone();
        for (i, layer) in layers.iter().enumerate() {
            if i == 0 {
                let view = self.world.view::<(ColoredSprite, Transform)>();
                let mut quads: Vec<Entity> = view.iter().collect();
                quads.sort_unstable();
                for e in quads {
                    if let (Some(quad), Some(t)) = (view.get::<ColoredSprite>(e), view.get::<Transform>(e)) {
                        renderer.draw_colored_quad(quad.color, &t.matrix());
                    }
                }
            }
            for (e, model) in self.sprites_in_layer(layer) {
                if let Some(sprite) = self.world.get::<Sprite>(e) {
                    renderer.draw_sprite(sprite, &model);
                }
            }
            if self.is_running() {
                let mut env = ScriptEnv {
                    input: &ctx.input,
                    time: &ctx.time,
                    destroy_queue: &mut self.destroy_queue,
                };
                self.script_faults +=
                    script::run_all(&mut self.world, &mut env, Callback::Render2d(layer));
            }
        }

        let view = self.world.view::<(LineRenderer,)>();
        let mut line_owners: Vec<Entity> = view.iter().collect();
        line_owners.sort_unstable();
        for e in line_owners {
            let Some(lines) = view.get::<LineRenderer>(e).filter(|l| l.active) else {
                continue;
            };
            for (from, to) in &lines.points {
                renderer.draw_line(from.extend(0.0), to.extend(0.0), lines.color);
            }
        }
        renderer.end_scene();

        if let Some(container) = self.gui_container() {
            render_gui(&self.world, container, renderer);
        }
    }

    /// Rebuild the picking buffer: sprite ids by layer, then widget ids.
    pub fn render_picking(&mut self) {
        self.picking.clear();
        let view_projection = self.view_projection();
        for layer in &self.config.sorting_layers {
            for (e, model) in self.sprites_in_layer(layer) {
                self.picking.fill_quad(&model, &view_projection, e);
            }
        }
        if let Some(container) = self.gui_container() {
            render_gui_picking(&self.world, container, &mut self.picking);
        }
    }

    /// One whole frame: update, render, picking pass.
    pub fn frame(&mut self, ctx: &EngineContext, renderer: &mut dyn Renderer2d) {
        self.update(ctx);
        self.render(ctx, renderer);
        self.render_picking();
    }

    /// Snapshot of this frame's counters. Resets the per-frame ones.
    #[cfg(feature = "diagnostics")]
    pub fn stats(&mut self) -> crate::diag::SceneStats {
        crate::diag::SceneStats {
            frame: self.frame,
            entities: self.world.take_entity_stats(),
            physics_bodies: self.physics.body_count(),
            destroyed_last_sweep: self.destroyed_last_sweep,
            script_faults: self.script_faults,
            pending_destruction: self.destroy_queue.len(),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.world.entity_count())
            .field("bodies", &self.physics.body_count())
            .field("state", &self.state)
            .field("frame", &self.frame)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::hierarchy::children;

    #[test]
    fn add_entity_carries_tag_transform_and_links() {
        let mut scene = Scene::default();
        let e = scene.add_entity("Player");
        assert!(scene.world().has::<Transform>(e));
        assert!(scene.world().has::<RelationShip>(e));
        assert_eq!(scene.entity_by_tag("Player"), Some(e));
        assert_eq!(scene.entity_by_tag("Nobody"), None);
    }

    #[test]
    fn destroyed_parent_orphans_children() {
        let mut scene = Scene::default();
        let ctx = EngineContext::new();
        let parent = scene.add_entity("Parent");
        let kids: Vec<Entity> = (0..3).map(|i| scene.add_entity(format!("Kid{i}"))).collect();
        for &k in &kids {
            scene.assign_to_parent(Some(parent), k).unwrap();
        }

        assert!(scene.mark_for_destruction(parent));
        assert!(!scene.mark_for_destruction(parent));
        assert!(scene.world().is_alive(parent));
        scene.update(&ctx);

        assert!(!scene.world().is_alive(parent));
        for k in kids {
            let rel = scene.world().get::<RelationShip>(k).unwrap();
            assert!(rel.is_root());
            assert_eq!(rel.next(), None);
            assert_eq!(rel.prev(), None);
        }
    }

    #[test]
    fn recursive_mark_takes_the_subtree() {
        let mut scene = Scene::default();
        let ctx = EngineContext::new();
        let root = scene.add_entity("Root");
        let child = scene.add_entity("Child");
        let keep = scene.add_entity("Keep");
        scene.assign_to_parent(Some(root), child).unwrap();
        assert_eq!(scene.mark_for_destruction_recursive(root), 2);
        scene.update(&ctx);
        assert!(!scene.world().is_alive(child));
        assert!(scene.world().is_alive(keep));
    }

    #[test]
    fn sprites_render_by_layer_order() {
        let config = SceneConfig::default().with_sorting_layers(["Back", "Front"]);
        let mut scene = Scene::new(config);
        let ctx = EngineContext::new();
        let front = scene.add_entity("Front");
        scene
            .world_mut()
            .insert(front, Sprite::new().material("front").layer("Front"));
        let back = scene.add_entity("Back");
        scene
            .world_mut()
            .insert(back, Sprite::new().material("back").layer("Back"));

        let mut recorder = crate::render2d::CommandRecorder::new();
        scene.render(&ctx, &mut recorder);
        let materials: Vec<String> = recorder
            .take()
            .into_iter()
            .filter_map(|c| match c {
                crate::render2d::DrawCommand::Sprite { material, .. } => material,
                _ => None,
            })
            .collect();
        assert_eq!(materials, ["back", "front"]);
    }

    #[test]
    fn sprite_is_pickable_after_picking_pass() {
        let mut scene = Scene::default();
        let e = scene.add_entity("Box");
        scene.world_mut().insert(e, Sprite::new());
        scene.render_picking();
        // The default camera shows 10x10 world units over 800x800 pixels; the
        // unit quad at the origin covers the centre of the window.
        assert_eq!(scene.pick(Vec2::new(400.0, 400.0)), Some(e));
        assert_eq!(scene.pick(Vec2::new(10.0, 10.0)), None);
    }

    #[test]
    fn gui_element_defaults_under_container() {
        let mut scene = Scene::default();
        let button = scene.add_gui_element("Button", None).unwrap();
        let container = scene.gui_container().unwrap();
        assert_eq!(children(scene.world(), container).collect::<Vec<_>>(), vec![button]);
        assert_eq!(scene.add_gui_container(), container);
    }

    #[test]
    fn viewport_resizes_picking_buffer() {
        let mut scene = Scene::default();
        scene.set_viewport(Rect::new(Vec2::new(10.0, 20.0), Vec2::new(330.0, 260.0)));
        assert_eq!(scene.picking_buffer().size(), crate::math::UVec2::new(320, 240));
        assert_eq!(scene.config().viewport_size, Vec2::new(320.0, 240.0));
    }
}
