#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use akkad::physics2d::{BodyHandle, BodySettings, BodyType2d, JointDef, JointHandle, PhysicsEngine2d};
use akkad::prelude::*;

/// Advance time, run one frame and close the input frame.
pub fn step(scene: &mut Scene, ctx: &mut EngineContext, renderer: &mut CommandRecorder) {
    ctx.time.advance(Duration::from_millis(16));
    scene.frame(ctx, renderer);
    ctx.input.end_frame();
}

pub fn step_n(scene: &mut Scene, ctx: &mut EngineContext, renderer: &mut CommandRecorder, n: usize) {
    for _ in 0..n {
        step(scene, ctx, renderer);
    }
}

/// Press the left button at a window position. Takes effect next frame.
pub fn press_at(ctx: &mut EngineContext, x: f32, y: f32) {
    ctx.input.set_cursor(x, y);
    ctx.input.press_mouse(MouseButton::Left);
}

pub fn release(ctx: &mut EngineContext) {
    ctx.input.release_mouse(MouseButton::Left);
}

/// Test engine: dynamic bodies fall one unit per step. Records every call.
#[derive(Debug, Default)]
pub struct FallingPhysics {
    pub bodies: HashMap<BodyHandle, (Vec2, f32, BodyType2d)>,
    pub joints: HashMap<JointHandle, (BodyHandle, BodyHandle)>,
    pub created: usize,
    pub destroyed: usize,
    pub steps: usize,
    next_id: u64,
}

impl PhysicsEngine2d for FallingPhysics {
    fn create_body(&mut self, settings: &BodySettings) -> BodyHandle {
        self.next_id += 1;
        self.created += 1;
        let handle = BodyHandle(self.next_id);
        self.bodies
            .insert(handle, (settings.position, settings.angle, settings.body_type));
        handle
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        if self.bodies.remove(&handle).is_some() {
            self.destroyed += 1;
        }
    }

    fn create_joint(&mut self, def: &JointDef) -> Option<JointHandle> {
        if !self.bodies.contains_key(&def.body_a) || !self.bodies.contains_key(&def.body_b) {
            return None;
        }
        self.next_id += 1;
        let handle = JointHandle(self.next_id);
        self.joints.insert(handle, (def.body_a, def.body_b));
        Some(handle)
    }

    fn destroy_joint(&mut self, handle: JointHandle) {
        self.joints.remove(&handle);
    }

    fn step(&mut self, _dt: f32) {
        self.steps += 1;
        for (pos, _, body_type) in self.bodies.values_mut() {
            if *body_type == BodyType2d::Dynamic {
                pos.y -= 1.0;
            }
        }
    }

    fn body_pose(&self, handle: BodyHandle) -> Option<(Vec2, f32)> {
        self.bodies.get(&handle).map(|(p, a, _)| (*p, *a))
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.joints.clear();
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// Small deterministic generator for operation sequences.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, n: usize) -> usize {
        self.next_u32() as usize % n
    }
}
