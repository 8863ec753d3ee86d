//! # Physics Bridge: Components to Bodies and Back
//!
//! The scene describes physics with plain components ([`RigidBody2d`],
//! [`HingeJoint2d`]) and drives any engine that implements
//! [`PhysicsEngine2d`]. The bridge functions here translate between the two:
//!
//! ```text
//!  scene start ──▶ init_bodies  (RigidBody2d + Transform → BodySettings → create_body)
//!              ──▶ init_joints  (HingeJoint2d → JointDef → create_joint)
//!  every frame ──▶ engine.step(dt)
//!              ──▶ sync_poses   (body_pose → Transform)
//!              ──▶ init_bodies, init_pending_joints (late additions)
//!  destruction ──▶ destroy_body (joints touching the entity first)
//!  scene stop  ──▶ teardown     (every handle dropped, engine cleared)
//! ```
//!
//! Each body walks a small state machine kept in its component:
//!
//! ```text
//!  Uninitialized ──create──▶ Active(handle) ──destroy/stop──▶ Destroyed
//!        ▲                                                       │
//!        └──────────────── (scene restart re-creates) ◀──────────┘
//! ```
//!
//! A joint is created only after both of its bodies are `Active`. A joint that
//! can't be created is reported and skipped; the rest of the scene starts.
//!
//! The rapier2d engine lives behind the `physics2d` feature in
//! [`rapier`](self::rapier). [`NullPhysics2d`] keeps bodies where they were
//! created and is the default when no engine is supplied.

#[cfg(feature = "physics2d")]
pub mod rapier;

#[cfg(feature = "physics2d")]
pub use self::rapier::RapierPhysics2d;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ecs::{Entity, World};
use crate::error::{AkkadError, Result};
use crate::math::{Quat, Transform, Vec2, Vec3, angle_to_quat, quat_to_angle};

// ── Handles & settings ──────────────────────────────────────────────────

/// Opaque engine-side body id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// Opaque engine-side joint id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType2d {
    Static,
    #[default]
    Dynamic,
    Kinematic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyShape2d {
    /// Box with half extents of half the transform scale.
    #[default]
    Box,
    /// Circle with radius of half the larger scale axis.
    Circle,
}

/// Everything an engine needs to create one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySettings {
    pub position: Vec2,
    pub angle: f32,
    pub body_type: BodyType2d,
    pub shape: BodyShape2d,
    pub half_extents: Vec2,
    pub density: f32,
    pub friction: f32,
}

impl BodySettings {
    /// Settings for `body` at the world pose of `transform`.
    pub fn from_components(body: &RigidBody2d, transform: &Transform) -> Self {
        let world = transform.world_translation();
        Self {
            position: Vec2::new(world.x, world.y),
            angle: quat_to_angle(transform.world_rotation()),
            body_type: body.body_type,
            shape: body.shape,
            half_extents: Vec2::new(transform.scale.x, transform.scale.y) * 0.5,
            density: body.density,
            friction: body.friction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HingeMotor {
    pub speed: f32,
    pub max_torque: f32,
}

/// Everything an engine needs to create one revolute joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub collide_connected: bool,
    pub motor: Option<HingeMotor>,
}

// ── Components ──────────────────────────────────────────────────────────

/// Lifecycle of an entity's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyState {
    #[default]
    Uninitialized,
    Active(BodyHandle),
    Destroyed,
}

/// A 2D rigid body. Pair with [`Transform`]; its scale is the collider size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBody2d {
    pub body_type: BodyType2d,
    pub shape: BodyShape2d,
    pub density: f32,
    pub friction: f32,
    #[serde(skip)]
    pub(crate) state: BodyState,
}

impl RigidBody2d {
    pub fn dynamic() -> Self {
        Self {
            body_type: BodyType2d::Dynamic,
            shape: BodyShape2d::Box,
            density: 1.0,
            friction: 0.3,
            state: BodyState::Uninitialized,
        }
    }

    pub fn fixed() -> Self {
        Self {
            body_type: BodyType2d::Static,
            ..Self::dynamic()
        }
    }

    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType2d::Kinematic,
            ..Self::dynamic()
        }
    }

    pub fn with_shape(mut self, shape: BodyShape2d) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn state(&self) -> BodyState {
        self.state
    }

    /// Engine handle while the body is active.
    pub fn handle(&self) -> Option<BodyHandle> {
        match self.state {
            BodyState::Active(handle) => Some(handle),
            _ => None,
        }
    }
}

impl Default for RigidBody2d {
    fn default() -> Self {
        Self::dynamic()
    }
}

/// A revolute joint between the bodies of two entities.
#[derive(Debug, Clone, PartialEq)]
pub struct HingeJoint2d {
    pub body_a: Option<Entity>,
    pub body_b: Option<Entity>,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub collide_connected: bool,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_torque: f32,
    pub(crate) handle: Option<JointHandle>,
}

impl HingeJoint2d {
    pub fn new(body_a: Entity, body_b: Entity) -> Self {
        Self {
            body_a: Some(body_a),
            body_b: Some(body_b),
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            collide_connected: false,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            handle: None,
        }
    }

    pub fn with_anchors(mut self, a: Vec2, b: Vec2) -> Self {
        self.local_anchor_a = a;
        self.local_anchor_b = b;
        self
    }

    pub fn with_motor(mut self, speed: f32, max_torque: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_torque = max_torque;
        self
    }

    pub fn handle(&self) -> Option<JointHandle> {
        self.handle
    }

    fn touches(&self, entity: Entity) -> bool {
        self.body_a == Some(entity) || self.body_b == Some(entity)
    }
}

// ── Engine seam ─────────────────────────────────────────────────────────

/// A 2D physics engine the scene can drive.
pub trait PhysicsEngine2d {
    fn create_body(&mut self, settings: &BodySettings) -> BodyHandle;

    /// Destroying an unknown handle is a no-op.
    fn destroy_body(&mut self, handle: BodyHandle);

    /// `None` if either body is unknown to the engine.
    fn create_joint(&mut self, def: &JointDef) -> Option<JointHandle>;

    fn destroy_joint(&mut self, handle: JointHandle);

    /// Advance the simulation by a frame delta in seconds.
    fn step(&mut self, dt: f32);

    /// World position and Z angle of a body.
    fn body_pose(&self, handle: BodyHandle) -> Option<(Vec2, f32)>;

    /// Drop every body and joint.
    fn clear(&mut self);

    fn body_count(&self) -> usize;
}

/// Engine that creates bodies but never moves them.
#[derive(Debug, Default)]
pub struct NullPhysics2d {
    bodies: HashMap<BodyHandle, (Vec2, f32)>,
    joints: HashMap<JointHandle, (BodyHandle, BodyHandle)>,
    next_id: u64,
}

impl NullPhysics2d {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }
}

impl PhysicsEngine2d for NullPhysics2d {
    fn create_body(&mut self, settings: &BodySettings) -> BodyHandle {
        let handle = BodyHandle(self.next());
        self.bodies.insert(handle, (settings.position, settings.angle));
        handle
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        self.bodies.remove(&handle);
        self.joints.retain(|_, (a, b)| *a != handle && *b != handle);
    }

    fn create_joint(&mut self, def: &JointDef) -> Option<JointHandle> {
        if !self.bodies.contains_key(&def.body_a) || !self.bodies.contains_key(&def.body_b) {
            return None;
        }
        let handle = JointHandle(self.next());
        self.joints.insert(handle, (def.body_a, def.body_b));
        Some(handle)
    }

    fn destroy_joint(&mut self, handle: JointHandle) {
        self.joints.remove(&handle);
    }

    fn step(&mut self, _dt: f32) {}

    fn body_pose(&self, handle: BodyHandle) -> Option<(Vec2, f32)> {
        self.bodies.get(&handle).copied()
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.joints.clear();
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

// ── Bridge ──────────────────────────────────────────────────────────────

/// Create the engine body for `entity` unless it is already active.
///
/// Returns `true` if a body was created.
pub fn init_body(world: &mut World, engine: &mut dyn PhysicsEngine2d, entity: Entity) -> bool {
    let settings = match (world.get::<RigidBody2d>(entity), world.get::<Transform>(entity)) {
        (Some(body), Some(transform)) if body.handle().is_none() => {
            BodySettings::from_components(body, transform)
        }
        _ => return false,
    };
    let handle = engine.create_body(&settings);
    if let Some(body) = world.get_mut::<RigidBody2d>(entity) {
        body.state = BodyState::Active(handle);
    }
    log::debug!("body {:?} created for {:?}", handle, entity);
    true
}

/// Create bodies for every entity with `RigidBody2d` and `Transform`.
pub fn init_bodies(world: &mut World, engine: &mut dyn PhysicsEngine2d) -> usize {
    let mut entities = world.entities_with::<RigidBody2d>();
    entities.sort_unstable();
    entities
        .into_iter()
        .filter(|e| init_body(world, engine, *e))
        .count()
}

fn active_body(world: &World, joint_entity: Entity, body: Option<Entity>, which: &str) -> Result<BodyHandle> {
    let body = body.ok_or_else(|| AkkadError::Joint {
        entity: joint_entity,
        reason: format!("{which} is not set"),
    })?;
    world
        .get::<RigidBody2d>(body)
        .and_then(RigidBody2d::handle)
        .ok_or_else(|| AkkadError::Joint {
            entity: joint_entity,
            reason: format!("{which} {body:?} has no active body"),
        })
}

/// Create the engine joint for the `HingeJoint2d` on `entity`.
///
/// Returns the existing handle if the joint is already created.
pub fn init_joint(world: &mut World, engine: &mut dyn PhysicsEngine2d, entity: Entity) -> Result<JointHandle> {
    let joint = world.component::<HingeJoint2d>(entity)?.clone();
    if let Some(handle) = joint.handle {
        return Ok(handle);
    }
    let def = JointDef {
        body_a: active_body(world, entity, joint.body_a, "body_a")?,
        body_b: active_body(world, entity, joint.body_b, "body_b")?,
        local_anchor_a: joint.local_anchor_a,
        local_anchor_b: joint.local_anchor_b,
        collide_connected: joint.collide_connected,
        motor: joint.enable_motor.then_some(HingeMotor {
            speed: joint.motor_speed,
            max_torque: joint.max_motor_torque,
        }),
    };
    let handle = engine.create_joint(&def).ok_or_else(|| AkkadError::Joint {
        entity,
        reason: "engine rejected the joint".to_string(),
    })?;
    if let Some(j) = world.get_mut::<HingeJoint2d>(entity) {
        j.handle = Some(handle);
    }
    Ok(handle)
}

/// Create every pending joint. Failures are logged and skipped.
pub fn init_joints(world: &mut World, engine: &mut dyn PhysicsEngine2d) -> usize {
    let mut entities = world.entities_with::<HingeJoint2d>();
    entities.sort_unstable();
    let mut created = 0;
    for entity in entities {
        match init_joint(world, engine, entity) {
            Ok(_) => created += 1,
            Err(err) => log::warn!("{err}"),
        }
    }
    created
}

/// Create joints still without a handle whose two bodies are now active.
/// Joints still waiting on a body are left pending without a warning.
pub fn init_pending_joints(world: &mut World, engine: &mut dyn PhysicsEngine2d) -> usize {
    let mut pending: Vec<Entity> = world
        .entities_with::<HingeJoint2d>()
        .into_iter()
        .filter(|e| {
            world.get::<HingeJoint2d>(*e).is_some_and(|joint| {
                joint.handle.is_none()
                    && [joint.body_a, joint.body_b].into_iter().all(|body| {
                        body.and_then(|b| world.get::<RigidBody2d>(b))
                            .is_some_and(|b| b.handle().is_some())
                    })
            })
        })
        .collect();
    pending.sort_unstable();
    let mut created = 0;
    for entity in pending {
        match init_joint(world, engine, entity) {
            Ok(_) => created += 1,
            Err(err) => log::debug!("{err}"),
        }
    }
    if created > 0 {
        log::debug!("created {created} pending joints");
    }
    created
}

/// Copy body poses into transforms. The body pose is world space; the local
/// translation/rotation are solved against the cached parent offsets.
pub fn sync_poses(world: &mut World, engine: &dyn PhysicsEngine2d) {
    world.query::<(&RigidBody2d, &mut Transform)>(|_, (body, transform)| {
        if body.body_type == BodyType2d::Static {
            return;
        }
        let Some((position, angle)) = body.handle().and_then(|h| engine.body_pose(h)) else {
            return;
        };
        let inv_parent: Quat = transform.parent_rotation.inverse();
        let world_pos = Vec3::new(position.x, position.y, transform.world_translation().z);
        let local = inv_parent * (world_pos - transform.parent_translation);
        transform.translation.x = local.x;
        transform.translation.y = local.y;
        transform.rotation = inv_parent * angle_to_quat(angle);
    });
}

/// Destroy the joints touching `entity` and then its body.
pub fn destroy_body(world: &mut World, engine: &mut dyn PhysicsEngine2d, entity: Entity) {
    world.query::<(&mut HingeJoint2d,)>(|owner, (joint,)| {
        if owner == entity || joint.touches(entity) {
            if let Some(handle) = joint.handle.take() {
                engine.destroy_joint(handle);
            }
        }
    });
    if let Some(body) = world.get_mut::<RigidBody2d>(entity) {
        if let BodyState::Active(handle) = body.state {
            engine.destroy_body(handle);
            body.state = BodyState::Destroyed;
        }
    }
}

/// Drop every joint and body and clear the engine.
pub fn teardown(world: &mut World, engine: &mut dyn PhysicsEngine2d) {
    world.query::<(&mut HingeJoint2d,)>(|_, (joint,)| {
        if let Some(handle) = joint.handle.take() {
            engine.destroy_joint(handle);
        }
    });
    world.query::<(&mut RigidBody2d,)>(|_, (body,)| {
        if let BodyState::Active(handle) = body.state {
            engine.destroy_body(handle);
            body.state = BodyState::Destroyed;
        }
    });
    engine.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_at(world: &mut World, x: f32, y: f32) -> Entity {
        world.spawn((RigidBody2d::dynamic(), Transform::from_xy(x, y).with_size(2.0, 4.0)))
    }

    #[test]
    fn settings_use_half_of_scale() {
        let body = RigidBody2d::dynamic().with_density(3.0);
        let s = BodySettings::from_components(&body, &Transform::from_xy(1.0, 2.0).with_size(2.0, 4.0));
        assert_eq!(s.half_extents, Vec2::new(1.0, 2.0));
        assert_eq!(s.position, Vec2::new(1.0, 2.0));
        assert_eq!(s.density, 3.0);
    }

    #[test]
    fn body_lifecycle() {
        let mut world = World::new();
        let mut engine = NullPhysics2d::new();
        let e = body_at(&mut world, 0.0, 0.0);

        assert_eq!(world.get::<RigidBody2d>(e).unwrap().state(), BodyState::Uninitialized);
        assert_eq!(init_bodies(&mut world, &mut engine), 1);
        assert!(matches!(world.get::<RigidBody2d>(e).unwrap().state(), BodyState::Active(_)));
        assert_eq!(init_bodies(&mut world, &mut engine), 0);

        destroy_body(&mut world, &mut engine, e);
        assert_eq!(world.get::<RigidBody2d>(e).unwrap().state(), BodyState::Destroyed);
        assert_eq!(engine.body_count(), 0);
    }

    #[test]
    fn joint_short_circuits_without_active_bodies() {
        let mut world = World::new();
        let mut engine = NullPhysics2d::new();
        let a = body_at(&mut world, 0.0, 0.0);
        let b = world.spawn_one(Transform::default());
        let j = world.spawn_one(HingeJoint2d::new(a, b));

        init_bodies(&mut world, &mut engine);
        assert_eq!(init_joints(&mut world, &mut engine), 0);
        assert!(matches!(
            init_joint(&mut world, &mut engine, j),
            Err(AkkadError::Joint { .. })
        ));
        assert!(world.get::<HingeJoint2d>(j).unwrap().handle().is_none());
    }

    #[test]
    fn joint_created_after_bodies_and_dropped_with_them() {
        let mut world = World::new();
        let mut engine = NullPhysics2d::new();
        let a = body_at(&mut world, 0.0, 0.0);
        let b = body_at(&mut world, 1.0, 0.0);
        let j = world.spawn_one(HingeJoint2d::new(a, b).with_motor(1.0, 10.0));

        init_bodies(&mut world, &mut engine);
        assert_eq!(init_joints(&mut world, &mut engine), 1);
        assert_eq!(engine.joint_count(), 1);

        destroy_body(&mut world, &mut engine, b);
        assert!(world.get::<HingeJoint2d>(j).unwrap().handle().is_none());
        assert_eq!(engine.joint_count(), 0);
    }

    #[test]
    fn teardown_marks_everything_destroyed() {
        let mut world = World::new();
        let mut engine = NullPhysics2d::new();
        let a = body_at(&mut world, 0.0, 0.0);
        init_bodies(&mut world, &mut engine);
        teardown(&mut world, &mut engine);
        assert_eq!(world.get::<RigidBody2d>(a).unwrap().state(), BodyState::Destroyed);
        assert_eq!(engine.body_count(), 0);

        // A restart creates the body again.
        assert_eq!(init_bodies(&mut world, &mut engine), 1);
    }

    #[test]
    fn sync_solves_local_pose_under_parent_offset() {
        let mut world = World::new();
        let mut engine = NullPhysics2d::new();
        let e = body_at(&mut world, 0.0, 0.0);
        world
            .get_mut::<Transform>(e)
            .unwrap()
            .set_parent_offset(Vec3::new(10.0, 0.0, 0.0), Quat::IDENTITY);
        init_bodies(&mut world, &mut engine);
        sync_poses(&mut world, &engine);

        let t = world.get::<Transform>(e).unwrap();
        assert!((t.translation.x).abs() < 1e-5);
        assert!((t.world_translation().x - 10.0).abs() < 1e-5);
    }
}
