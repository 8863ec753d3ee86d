//! # Entity Hierarchies: Intrusive Sibling Lists
//!
//! Parent/child links live in a single [`RelationShip`] component per entity.
//! Children of a node form a doubly-linked list threaded through the children
//! themselves:
//!
//! ```text
//!            R { first_child: C1, last_child: C3, children: 3 }
//!            │
//!   ┌────────┴──────────────────────────────┐
//!   ▼                                       ▼
//!  C1 ──next──▶ C2 ──next──▶ C3            (last)
//!  C1 ◀──prev── C2 ◀──prev── C3
//!  parent = R for every Ci
//! ```
//!
//! Invariants kept by every function in this module:
//!
//! - Walking `next` from `first_child` visits exactly `children` entities and
//!   ends at `last_child`; `prev` mirrors `next`.
//! - `parent` of every listed child is the list owner.
//! - No node is its own ancestor. [`assign_to_parent`] checks this before it
//!   touches any link.
//!
//! The link fields are private. Other subsystems read them through getters and
//! mutate only through the functions here. Every traversal is bounded by the
//! recorded `children` count (or by the live entity count for ancestor walks),
//! so a corrupted list cannot spin forever.
//!
//! ## Transform Propagation
//!
//! [`propagate_transforms`] walks the forest breadth-first from the roots and
//! copies each parent's world translation/rotation into the child's
//! parent-offset fields. Parents are always resolved before children, so a
//! chain of any depth settles in one pass.
//!
//! ## Comparison
//!
//! - **bevy_hierarchy**: `Parent` + `Children(SmallVec)` components.
//! - **EnTT cookbook**: the same intrusive `first/next/prev` layout used here,
//!   which keeps one fixed-size component per entity.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ecs::entity::Entity;
use crate::ecs::world::World;
use crate::error::{AkkadError, Result};
use crate::math::{Quat, Transform, Vec3};

/// Parent/child/sibling links of one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationShip {
    parent: Option<Entity>,
    first_child: Option<Entity>,
    last_child: Option<Entity>,
    next: Option<Entity>,
    prev: Option<Entity>,
    children: usize,
}

impl RelationShip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    pub fn first_child(&self) -> Option<Entity> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<Entity> {
        self.last_child
    }

    pub fn next(&self) -> Option<Entity> {
        self.next
    }

    pub fn prev(&self) -> Option<Entity> {
        self.prev
    }

    /// Number of direct children.
    pub fn children(&self) -> usize {
        self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Marker: the entity keeps its local transform as its world transform and is
/// skipped by [`propagate_transforms`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreParentTransform;

fn links(world: &World, entity: Entity) -> Result<RelationShip> {
    world.component::<RelationShip>(entity).copied()
}

fn links_mut(world: &mut World, entity: Entity) -> Option<&mut RelationShip> {
    world.get_mut::<RelationShip>(entity)
}

/// Make `child` the last child of `parent`, or detach it to the root when
/// `parent` is `None`.
///
/// - `CyclicReparent` if `child == parent` or `parent` is a descendant of
///   `child`. Nothing is modified in that case.
/// - No-op if `child` is already a direct child of `parent`.
pub fn assign_to_parent(world: &mut World, parent: Option<Entity>, child: Entity) -> Result<()> {
    let child_links = links(world, child)?;

    let Some(parent) = parent else {
        if child_links.parent.is_some() {
            detach(world, child);
        }
        return Ok(());
    };

    links(world, parent)?;
    if parent == child || has_hierarchy_descendant(world, child, parent) {
        return Err(AkkadError::CyclicReparent { parent, child });
    }
    if child_links.parent == Some(parent) {
        return Ok(());
    }

    detach(world, child);
    append(world, parent, child);
    Ok(())
}

/// Unlink `child` from its parent's sibling list. `child` becomes a root and
/// keeps its own subtree.
fn detach(world: &mut World, child: Entity) {
    let Some(rel) = world.get::<RelationShip>(child).copied() else {
        return;
    };

    if let Some(parent) = rel.parent {
        if let Some(p) = links_mut(world, parent) {
            if p.first_child == Some(child) {
                p.first_child = rel.next;
            }
            if p.last_child == Some(child) {
                p.last_child = rel.prev;
            }
            p.children = p.children.saturating_sub(1);
            if p.children == 0 {
                p.first_child = None;
                p.last_child = None;
            }
        }
    }
    if let Some(next) = rel.next {
        if let Some(n) = links_mut(world, next) {
            n.prev = rel.prev;
        }
    }
    if let Some(prev) = rel.prev {
        if let Some(p) = links_mut(world, prev) {
            p.next = rel.next;
        }
    }

    if let Some(c) = links_mut(world, child) {
        c.parent = None;
        c.next = None;
        c.prev = None;
    }
}

/// Append a detached `child` at the tail of `parent`'s list.
fn append(world: &mut World, parent: Entity, child: Entity) {
    let Some(p) = world.get::<RelationShip>(parent).copied() else {
        return;
    };
    let tail = p.last_child.filter(|t| p.children > 0 && world.is_alive(*t));

    if let Some(tail) = tail {
        if let Some(t) = links_mut(world, tail) {
            t.next = Some(child);
        }
    }
    if let Some(c) = links_mut(world, child) {
        c.parent = Some(parent);
        c.prev = tail;
        c.next = None;
    }
    if let Some(p) = links_mut(world, parent) {
        if tail.is_none() {
            p.first_child = Some(child);
        }
        p.last_child = Some(child);
        p.children += 1;
    }
}

/// Take `entity` out of the tree entirely: unlink it from its parent and
/// siblings and orphan its direct children to the root.
///
/// The entity keeps its `RelationShip` component with every link cleared.
pub fn remove_from_hierarchy(world: &mut World, entity: Entity) -> Result<()> {
    links(world, entity)?;
    detach(world, entity);

    for child in children(world, entity).collect::<Vec<_>>() {
        if let Some(c) = links_mut(world, child) {
            c.parent = None;
            c.next = None;
            c.prev = None;
        }
    }
    if let Some(rel) = links_mut(world, entity) {
        rel.first_child = None;
        rel.last_child = None;
        rel.children = 0;
    }
    Ok(())
}

/// Detach `entity` from its parent and despawn it together with its whole
/// subtree. Every handle in the subtree is stale when this returns.
///
/// Returns the despawned entities, root first.
pub fn remove_with_descendants(world: &mut World, entity: Entity) -> Result<Vec<Entity>> {
    links(world, entity)?;
    let subtree = descendants(world, entity);
    detach(world, entity);
    for &e in &subtree {
        world.despawn(e);
    }
    Ok(subtree)
}

/// `true` if `candidate` is a direct child of `parent`.
pub fn has_child(world: &World, parent: Entity, candidate: Entity) -> bool {
    world.is_alive(parent)
        && world
            .get::<RelationShip>(candidate)
            .is_some_and(|r| r.parent == Some(parent))
}

/// `true` if `candidate` is anywhere below `ancestor`.
///
/// Walks `candidate`'s parent chain, so the cost is its depth. The walk is
/// capped at the live entity count.
pub fn has_hierarchy_descendant(world: &World, ancestor: Entity, candidate: Entity) -> bool {
    let mut current = world.get::<RelationShip>(candidate).and_then(|r| r.parent);
    let mut budget = world.entity_count();
    while let Some(node) = current {
        if node == ancestor {
            return true;
        }
        if budget == 0 {
            log::warn!("parent chain of {:?} exceeds the entity count", candidate);
            return false;
        }
        budget -= 1;
        current = world.get::<RelationShip>(node).and_then(|r| r.parent);
    }
    false
}

/// Iterator over the direct children of an entity, in sibling order.
pub struct ChildIter<'w> {
    world: &'w World,
    next: Option<Entity>,
    remaining: usize,
}

impl Iterator for ChildIter<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.world.get::<RelationShip>(current).and_then(|r| r.next);
        Some(current)
    }
}

/// Direct children of `parent`, bounded by its recorded child count.
pub fn children(world: &World, parent: Entity) -> ChildIter<'_> {
    let rel = world.get::<RelationShip>(parent).copied().unwrap_or_default();
    ChildIter {
        world,
        next: rel.first_child,
        remaining: rel.children,
    }
}

/// `root` and everything below it, breadth-first.
pub fn descendants(world: &World, root: Entity) -> Vec<Entity> {
    if !world.has::<RelationShip>(root) {
        return Vec::new();
    }
    let mut out = vec![root];
    let mut i = 0;
    while i < out.len() {
        let current = out[i];
        out.extend(children(world, current));
        i += 1;
    }
    out
}

/// Entities with a `RelationShip` and no parent.
pub fn roots(world: &World) -> Vec<Entity> {
    let mut roots: Vec<Entity> = world
        .entities_with::<RelationShip>()
        .into_iter()
        .filter(|e| world.get::<RelationShip>(*e).is_some_and(RelationShip::is_root))
        .collect();
    roots.sort_unstable();
    roots
}

/// Check the sibling-list invariants for `parent`'s children.
pub fn sibling_list_is_consistent(world: &World, parent: Entity) -> bool {
    let Some(rel) = world.get::<RelationShip>(parent) else {
        return false;
    };
    let mut prev = None;
    let mut current = rel.first_child;
    for _ in 0..rel.children {
        let Some(node) = current else {
            return false;
        };
        let Some(links) = world.get::<RelationShip>(node) else {
            return false;
        };
        if links.parent != Some(parent) || links.prev != prev {
            return false;
        }
        prev = Some(node);
        current = links.next;
    }
    current.is_none() && rel.last_child == prev
}

// ── Transform Propagation ────────────────────────────────────────────────

/// Push resolved parent poses into children's parent-offset fields.
///
/// - Entities marked [`IgnoreParentTransform`] are skipped.
/// - Roots, and children of a parent without `Transform`, get their offsets
///   cleared.
pub fn propagate_transforms(world: &mut World) {
    let mut queue: VecDeque<(Entity, Option<(Vec3, Quat)>)> = VecDeque::new();
    for root in roots(world) {
        queue.push_back((root, None));
    }

    while let Some((entity, parent_pose)) = queue.pop_front() {
        let skip = world.has::<IgnoreParentTransform>(entity);
        if !skip {
            if let Some(t) = world.get_mut::<Transform>(entity) {
                match parent_pose {
                    Some((translation, rotation)) => t.set_parent_offset(translation, rotation),
                    None => t.clear_parent_offset(),
                }
            }
        }

        let pose = world
            .get::<Transform>(entity)
            .map(|t| (t.world_translation(), t.world_rotation()));
        for child in children(world, entity).collect::<Vec<_>>() {
            queue.push_back((child, pose));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(world: &mut World) -> Entity {
        world.spawn((RelationShip::new(), Transform::default()))
    }

    fn rel(world: &World, e: Entity) -> RelationShip {
        *world.get::<RelationShip>(e).unwrap()
    }

    #[test]
    fn append_keeps_sibling_order() {
        let mut world = World::new();
        let r = node(&mut world);
        let c1 = node(&mut world);
        let c2 = node(&mut world);
        let c3 = node(&mut world);
        for c in [c1, c2, c3] {
            assign_to_parent(&mut world, Some(r), c).unwrap();
        }

        assert_eq!(rel(&world, r).children(), 3);
        assert_eq!(rel(&world, r).first_child(), Some(c1));
        assert_eq!(rel(&world, r).last_child(), Some(c3));
        assert_eq!(children(&world, r).collect::<Vec<_>>(), vec![c1, c2, c3]);
        assert!(sibling_list_is_consistent(&world, r));
    }

    #[test]
    fn removing_middle_child_relinks_neighbours() {
        let mut world = World::new();
        let r = node(&mut world);
        let c1 = node(&mut world);
        let c2 = node(&mut world);
        let c3 = node(&mut world);
        for c in [c1, c2, c3] {
            assign_to_parent(&mut world, Some(r), c).unwrap();
        }

        remove_from_hierarchy(&mut world, c2).unwrap();

        assert_eq!(rel(&world, r).children(), 2);
        assert_eq!(rel(&world, c1).next(), Some(c3));
        assert_eq!(rel(&world, c3).prev(), Some(c1));
        assert!(rel(&world, c2).is_root());
        assert!(sibling_list_is_consistent(&world, r));
    }

    #[test]
    fn removing_head_and_tail_repoints_ends() {
        let mut world = World::new();
        let r = node(&mut world);
        let c1 = node(&mut world);
        let c2 = node(&mut world);
        let c3 = node(&mut world);
        for c in [c1, c2, c3] {
            assign_to_parent(&mut world, Some(r), c).unwrap();
        }

        assign_to_parent(&mut world, None, c1).unwrap();
        assert_eq!(rel(&world, r).first_child(), Some(c2));
        assign_to_parent(&mut world, None, c3).unwrap();
        assert_eq!(rel(&world, r).last_child(), Some(c2));
        assign_to_parent(&mut world, None, c2).unwrap();
        assert_eq!(rel(&world, r).first_child(), None);
        assert_eq!(rel(&world, r).last_child(), None);
        assert_eq!(rel(&world, r).children(), 0);
    }

    #[test]
    fn cycle_is_rejected_without_mutation() {
        let mut world = World::new();
        let a = node(&mut world);
        let b = node(&mut world);
        let c = node(&mut world);
        assign_to_parent(&mut world, Some(a), b).unwrap();
        assign_to_parent(&mut world, Some(b), c).unwrap();

        let before = (rel(&world, a), rel(&world, b), rel(&world, c));
        let err = assign_to_parent(&mut world, Some(c), a).unwrap_err();
        assert!(matches!(err, AkkadError::CyclicReparent { .. }));
        assert!(assign_to_parent(&mut world, Some(a), a).is_err());
        assert_eq!(before, (rel(&world, a), rel(&world, b), rel(&world, c)));
    }

    #[test]
    fn reparent_moves_counts() {
        let mut world = World::new();
        let p1 = node(&mut world);
        let p2 = node(&mut world);
        let c = node(&mut world);
        assign_to_parent(&mut world, Some(p1), c).unwrap();
        assign_to_parent(&mut world, Some(p2), c).unwrap();

        assert_eq!(rel(&world, p1).children(), 0);
        assert_eq!(rel(&world, p2).children(), 1);
        assert_eq!(rel(&world, c).parent(), Some(p2));
        assert!(has_child(&world, p2, c));
        assert!(!has_child(&world, p1, c));
    }

    #[test]
    fn assigning_existing_parent_is_noop() {
        let mut world = World::new();
        let p = node(&mut world);
        let c = node(&mut world);
        assign_to_parent(&mut world, Some(p), c).unwrap();
        assign_to_parent(&mut world, Some(p), c).unwrap();
        assert_eq!(rel(&world, p).children(), 1);
    }

    #[test]
    fn descendant_query_walks_depth() {
        let mut world = World::new();
        let a = node(&mut world);
        let b = node(&mut world);
        let c = node(&mut world);
        assign_to_parent(&mut world, Some(a), b).unwrap();
        assign_to_parent(&mut world, Some(b), c).unwrap();
        assert!(has_hierarchy_descendant(&world, a, c));
        assert!(!has_hierarchy_descendant(&world, c, a));
        assert_eq!(descendants(&world, a), vec![a, b, c]);
    }

    #[test]
    fn remove_from_hierarchy_orphans_children() {
        let mut world = World::new();
        let p = node(&mut world);
        let c1 = node(&mut world);
        let c2 = node(&mut world);
        assign_to_parent(&mut world, Some(p), c1).unwrap();
        assign_to_parent(&mut world, Some(p), c2).unwrap();

        remove_from_hierarchy(&mut world, p).unwrap();
        assert!(rel(&world, c1).is_root());
        assert!(rel(&world, c2).is_root());
        assert_eq!(rel(&world, c2).prev(), None);
        assert_eq!(rel(&world, p).children(), 0);
    }

    #[test]
    fn remove_with_descendants_invalidates_subtree() {
        let mut world = World::new();
        let root = node(&mut world);
        let p = node(&mut world);
        let c = node(&mut world);
        let g = node(&mut world);
        assign_to_parent(&mut world, Some(root), p).unwrap();
        assign_to_parent(&mut world, Some(p), c).unwrap();
        assign_to_parent(&mut world, Some(c), g).unwrap();

        let gone = remove_with_descendants(&mut world, p).unwrap();
        assert_eq!(gone, vec![p, c, g]);
        assert!(gone.iter().all(|e| !world.is_alive(*e)));
        assert_eq!(rel(&world, root).children(), 0);
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn missing_relationship_is_reported() {
        let mut world = World::new();
        let bare = world.spawn_empty();
        let p = node(&mut world);
        assert!(matches!(
            assign_to_parent(&mut world, Some(p), bare),
            Err(AkkadError::MissingComponent { .. })
        ));
    }

    #[test]
    fn child_follows_parent_translation_and_rotation() {
        let mut world = World::new();
        let parent = world.spawn((
            RelationShip::new(),
            Transform::from_xy(10.0, 0.0).with_rotation_z(std::f32::consts::FRAC_PI_2),
        ));
        let child = world.spawn((RelationShip::new(), Transform::from_xy(1.0, 0.0)));
        assign_to_parent(&mut world, Some(parent), child).unwrap();

        propagate_transforms(&mut world);

        let w = world.get::<Transform>(child).unwrap().world_translation();
        assert!((w.x - 10.0).abs() < 1e-4);
        assert!((w.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn deep_chain_resolves_in_one_pass_and_is_idempotent() {
        let mut world = World::new();
        let a = world.spawn((RelationShip::new(), Transform::from_xy(1.0, 0.0)));
        let b = world.spawn((RelationShip::new(), Transform::from_xy(2.0, 0.0)));
        let c = world.spawn((RelationShip::new(), Transform::from_xy(3.0, 0.0)));
        assign_to_parent(&mut world, Some(a), b).unwrap();
        assign_to_parent(&mut world, Some(b), c).unwrap();

        propagate_transforms(&mut world);
        let once = *world.get::<Transform>(c).unwrap();
        propagate_transforms(&mut world);
        let twice = *world.get::<Transform>(c).unwrap();

        assert!((once.world_translation().x - 6.0).abs() < 1e-4);
        assert_eq!(once, twice);
    }

    #[test]
    fn ignore_marker_keeps_local_pose() {
        let mut world = World::new();
        let parent = world.spawn((RelationShip::new(), Transform::from_xy(100.0, 0.0)));
        let child = world.spawn((
            RelationShip::new(),
            Transform::from_xy(1.0, 0.0),
            IgnoreParentTransform,
        ));
        assign_to_parent(&mut world, Some(parent), child).unwrap();

        propagate_transforms(&mut world);
        assert_eq!(world.get::<Transform>(child).unwrap().world_translation().x, 1.0);
    }

    #[test]
    fn detached_child_drops_offsets() {
        let mut world = World::new();
        let parent = world.spawn((RelationShip::new(), Transform::from_xy(5.0, 0.0)));
        let child = world.spawn((RelationShip::new(), Transform::from_xy(1.0, 0.0)));
        assign_to_parent(&mut world, Some(parent), child).unwrap();
        propagate_transforms(&mut world);
        assign_to_parent(&mut world, None, child).unwrap();
        propagate_transforms(&mut world);
        assert_eq!(world.get::<Transform>(child).unwrap().world_translation().x, 1.0);
    }

    #[test]
    fn despawning_a_parent_orphans_its_children() {
        let mut world = World::new();
        let r = node(&mut world);
        let kids = [node(&mut world), node(&mut world)];
        for k in kids {
            assign_to_parent(&mut world, Some(r), k).unwrap();
        }

        assert!(world.despawn(r));
        for k in kids {
            let links = rel(&world, k);
            assert!(links.is_root());
            assert_eq!((links.prev(), links.next()), (None, None));
        }
        let mut found = roots(&world);
        found.sort_unstable();
        assert_eq!(found, kids.to_vec());
    }

    #[test]
    fn despawning_a_middle_child_relinks_siblings() {
        let mut world = World::new();
        let r = node(&mut world);
        let c: Vec<Entity> = (0..3).map(|_| node(&mut world)).collect();
        for &k in &c {
            assign_to_parent(&mut world, Some(r), k).unwrap();
        }

        world.despawn(c[1]);
        assert!(sibling_list_is_consistent(&world, r));
        assert_eq!(children(&world, r).collect::<Vec<_>>(), vec![c[0], c[2]]);
        assert_eq!(rel(&world, r).children(), 2);

        // Appending after the despawn keeps the surviving list.
        let late = node(&mut world);
        assign_to_parent(&mut world, Some(r), late).unwrap();
        assert_eq!(children(&world, r).collect::<Vec<_>>(), vec![c[0], c[2], late]);
    }
}
