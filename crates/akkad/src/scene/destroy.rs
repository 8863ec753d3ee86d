//! Deferred entity destruction.
//!
//! Anything that wants an entity gone during a frame (scripts, GUI callbacks,
//! game logic) marks it. The scene drains the queue once per frame, after
//! physics and transform propagation, so nothing mid-frame sees a handle go
//! stale underneath it.
//!
//! Draining takes the whole pending batch up front. Marks made while a batch
//! is being processed land in the fresh queue and wait for the next drain.

use crate::ecs::Entity;

/// Ordered, de-duplicated set of entities awaiting destruction.
#[derive(Debug, Default)]
pub struct DestructionQueue {
    pending: Vec<Entity>,
}

impl DestructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `entity`. Returns `false` if it was already queued.
    pub fn mark(&mut self, entity: Entity) -> bool {
        if self.pending.contains(&entity) {
            return false;
        }
        self.pending.push(entity);
        true
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.pending.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take the current batch, leaving the queue empty.
    pub(crate) fn take_batch(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.pending)
    }
}
