//! Script host.
//!
//! A [`Script`] is per-entity behavior attached through a [`ScriptComponent`].
//! Callbacks return [`ScriptResult`]. A failing callback is logged with the
//! entity and callback name, and the frame carries on with the next entity.
//!
//! While a callback runs, its instance is taken out of the component and the
//! script receives `&mut World` through [`ScriptContext`]. The instance is put
//! back afterwards unless the entity was despawned in the meantime.

use crate::ecs::{Entity, World};
use crate::error::AkkadError;
use crate::input::InputState;
use crate::scene::destroy::DestructionQueue;
use crate::time::Time;

pub type ScriptError = Box<dyn std::error::Error + Send + Sync>;
pub type ScriptResult = std::result::Result<(), ScriptError>;

/// Per-entity behavior. Every callback defaults to doing nothing.
pub trait Script: Send + Sync {
    fn on_start(&mut self, _ctx: &mut ScriptContext<'_>) -> ScriptResult {
        Ok(())
    }

    fn on_update(&mut self, _ctx: &mut ScriptContext<'_>) -> ScriptResult {
        Ok(())
    }

    /// Called once per sorting layer during the render pass.
    fn on_render_2d(&mut self, _ctx: &mut ScriptContext<'_>, _layer: &str) -> ScriptResult {
        Ok(())
    }
}

/// What a script callback can reach.
pub struct ScriptContext<'a> {
    pub entity: Entity,
    pub world: &'a mut World,
    pub input: &'a InputState,
    pub time: &'a Time,
    pub(crate) destroy_queue: &'a mut DestructionQueue,
}

impl ScriptContext<'_> {
    /// Queue an entity for destruction at the next sweep.
    pub fn destroy(&mut self, entity: Entity) {
        self.destroy_queue.mark(entity);
    }

    /// Queue the entity running this script for destruction.
    pub fn destroy_self(&mut self) {
        let entity = self.entity;
        self.destroy(entity);
    }
}

/// Holds a script instance on an entity.
pub struct ScriptComponent {
    instance: Option<Box<dyn Script>>,
    started: bool,
}

impl ScriptComponent {
    pub fn new(script: impl Script + 'static) -> Self {
        Self {
            instance: Some(Box::new(script)),
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Drop the instance. The component stays, inert.
    pub(crate) fn release(&mut self) {
        self.instance = None;
        self.started = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Callback<'l> {
    Start,
    Update,
    Render2d(&'l str),
}

impl Callback<'_> {
    fn name(&self) -> &'static str {
        match self {
            Callback::Start => "on_start",
            Callback::Update => "on_update",
            Callback::Render2d(_) => "on_render_2d",
        }
    }
}

/// Shared borrowed state for a batch of callbacks.
pub(crate) struct ScriptEnv<'a> {
    pub input: &'a InputState,
    pub time: &'a Time,
    pub destroy_queue: &'a mut DestructionQueue,
}

/// Run one callback on `entity`'s script.
///
/// Returns the fault, already logged, if the callback failed. A missing or
/// released instance is skipped silently.
pub(crate) fn run_callback(
    world: &mut World,
    env: &mut ScriptEnv<'_>,
    entity: Entity,
    callback: Callback<'_>,
) -> Option<AkkadError> {
    let mut instance = world
        .get_mut::<ScriptComponent>(entity)
        .and_then(|s| s.instance.take())?;

    let result = {
        let mut ctx = ScriptContext {
            entity,
            world: &mut *world,
            input: env.input,
            time: env.time,
            destroy_queue: &mut *env.destroy_queue,
        };
        match callback {
            Callback::Start => instance.on_start(&mut ctx),
            Callback::Update => instance.on_update(&mut ctx),
            Callback::Render2d(layer) => instance.on_render_2d(&mut ctx, layer),
        }
    };

    if let Some(slot) = world.get_mut::<ScriptComponent>(entity) {
        if slot.instance.is_none() {
            slot.instance = Some(instance);
        }
        if callback == Callback::Start {
            slot.started = true;
        }
    }

    result.err().map(|err| {
        let fault = AkkadError::Script {
            entity,
            callback: callback.name(),
            message: err.to_string(),
        };
        log::error!("{fault}");
        fault
    })
}

/// Run `callback` on every scripted entity. `Start` reaches only scripts that
/// have not started; every other callback only scripts that have. Returns how
/// many failed.
pub(crate) fn run_all(world: &mut World, env: &mut ScriptEnv<'_>, callback: Callback<'_>) -> usize {
    let mut entities = world.entities_with::<ScriptComponent>();
    entities.sort_unstable();
    let want_started = callback != Callback::Start;
    entities.retain(|e| {
        world
            .get::<ScriptComponent>(*e)
            .is_some_and(|s| s.instance.is_some() && s.started == want_started)
    });
    entities
        .into_iter()
        .filter(|e| run_callback(world, env, *e, callback).is_some())
        .count()
}

/// Drop every script instance.
pub(crate) fn release_all(world: &mut World) {
    world.query::<(&mut ScriptComponent,)>(|_, (script,)| script.release());
}
