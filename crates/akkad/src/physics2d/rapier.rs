//! rapier2d-backed [`PhysicsEngine2d`].
//!
//! Runs with a fixed timestep (default 1/60s) using an accumulator to
//! decouple simulation from frame rate.

use std::collections::HashMap;

use rapier2d::prelude::*;

use super::{BodyHandle, BodySettings, BodyShape2d, BodyType2d, JointDef, JointHandle, PhysicsEngine2d};
use crate::config::SceneConfig;

type EngineVec2 = crate::math::Vec2;

fn body_type_to_rapier(bt: BodyType2d) -> RigidBodyType {
    match bt {
        BodyType2d::Static => RigidBodyType::Fixed,
        BodyType2d::Dynamic => RigidBodyType::Dynamic,
        BodyType2d::Kinematic => RigidBodyType::KinematicPositionBased,
    }
}

fn to_rapier(v: EngineVec2) -> Vector {
    Vector::new(v.x, v.y)
}

/// The 2D physics world behind the scene's engine seam.
pub struct RapierPhysics2d {
    gravity: Vector,
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    body_handles: HashMap<BodyHandle, RigidBodyHandle>,
    joint_handles: HashMap<JointHandle, ImpulseJointHandle>,
    next_id: u64,
    accumulator: f32,
}

impl std::fmt::Debug for RapierPhysics2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierPhysics2d")
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("joints", &self.joint_handles.len())
            .finish()
    }
}

impl RapierPhysics2d {
    /// Create a world with gravity (0, -10) and a 1/60s step.
    pub fn new() -> Self {
        Self {
            gravity: Vector::new(0.0, -10.0),
            pipeline: PhysicsPipeline::new(),
            params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            body_handles: HashMap::new(),
            joint_handles: HashMap::new(),
            next_id: 0,
            accumulator: 0.0,
        }
    }

    /// Gravity and timestep from the scene config.
    pub fn from_config(config: &SceneConfig) -> Self {
        let mut engine = Self::new();
        engine.gravity = to_rapier(config.gravity);
        engine.params.dt = config.fixed_timestep;
        engine
    }

    pub fn with_gravity(mut self, gravity: EngineVec2) -> Self {
        self.gravity = to_rapier(gravity);
        self
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Default for RapierPhysics2d {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsEngine2d for RapierPhysics2d {
    fn create_body(&mut self, settings: &BodySettings) -> BodyHandle {
        let rb = RigidBodyBuilder::new(body_type_to_rapier(settings.body_type))
            .translation(to_rapier(settings.position))
            .rotation(settings.angle)
            .build();
        let rb_handle = self.bodies.insert(rb);

        let collider = match settings.shape {
            BodyShape2d::Box => ColliderBuilder::cuboid(settings.half_extents.x, settings.half_extents.y),
            BodyShape2d::Circle => ColliderBuilder::ball(settings.half_extents.max_element()),
        }
        .density(settings.density)
        .friction(settings.friction)
        .build();
        self.colliders
            .insert_with_parent(collider, rb_handle, &mut self.bodies);

        let handle = BodyHandle(self.next());
        self.body_handles.insert(handle, rb_handle);
        handle
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        let Some(rb_handle) = self.body_handles.remove(&handle) else {
            return;
        };
        self.bodies.remove(
            rb_handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        // rapier drops attached joints with the body.
        let impulse_joints = &self.impulse_joints;
        self.joint_handles.retain(|_, h| impulse_joints.get(*h).is_some());
    }

    fn create_joint(&mut self, def: &JointDef) -> Option<JointHandle> {
        let body_a = *self.body_handles.get(&def.body_a)?;
        let body_b = *self.body_handles.get(&def.body_b)?;

        let mut builder = RevoluteJointBuilder::new()
            .local_anchor1(to_rapier(def.local_anchor_a))
            .local_anchor2(to_rapier(def.local_anchor_b))
            .contacts_enabled(def.collide_connected);
        if let Some(motor) = def.motor {
            builder = builder
                .motor_velocity(motor.speed, 1.0)
                .motor_max_force(motor.max_torque);
        }
        let joint: GenericJoint = builder.into();
        let joint_handle = self.impulse_joints.insert(body_a, body_b, joint, true);

        let handle = JointHandle(self.next());
        self.joint_handles.insert(handle, joint_handle);
        Some(handle)
    }

    fn destroy_joint(&mut self, handle: JointHandle) {
        if let Some(joint_handle) = self.joint_handles.remove(&handle) {
            self.impulse_joints.remove(joint_handle, true);
        }
    }

    fn step(&mut self, dt: f32) {
        // Capped to prevent spiral of death.
        self.accumulator += dt.min(0.25);
        let fixed_dt = self.params.dt;
        while self.accumulator >= fixed_dt {
            self.pipeline.step(
                self.gravity,
                &self.params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                &(),
                &(),
            );
            self.accumulator -= fixed_dt;
        }
    }

    fn body_pose(&self, handle: BodyHandle) -> Option<(EngineVec2, f32)> {
        let body = self.bodies.get(*self.body_handles.get(&handle)?)?;
        let pos = body.translation();
        Some((EngineVec2::new(pos.x, pos.y), body.rotation().angle()))
    }

    fn clear(&mut self) {
        let gravity = self.gravity;
        let dt = self.params.dt;
        *self = Self::new();
        self.gravity = gravity;
        self.params.dt = dt;
    }

    fn body_count(&self) -> usize {
        self.body_handles.len()
    }
}
