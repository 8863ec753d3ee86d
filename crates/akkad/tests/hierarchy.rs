mod common;

use akkad::ecs::hierarchy::{
    assign_to_parent, children, has_child, has_hierarchy_descendant, remove_from_hierarchy,
    sibling_list_is_consistent,
};
use akkad::prelude::*;

use common::Lcg;

fn forest(n: usize) -> (World, Vec<Entity>) {
    let mut world = World::new();
    let nodes = (0..n)
        .map(|i| world.spawn((RelationShip::new(), Transform::from_xy(i as f32, 0.0))))
        .collect();
    (world, nodes)
}

fn snapshot(world: &World, nodes: &[Entity]) -> Vec<RelationShip> {
    nodes.iter().map(|e| *world.get::<RelationShip>(*e).unwrap()).collect()
}

fn backward_count(world: &World, parent: Entity) -> usize {
    let rel = world.get::<RelationShip>(parent).unwrap();
    let mut count = 0;
    let mut current = rel.last_child();
    while let Some(node) = current {
        count += 1;
        assert!(count <= rel.children(), "prev chain longer than child count");
        current = world.get::<RelationShip>(node).unwrap().prev();
    }
    count
}

fn assert_forest_invariants(world: &World, nodes: &[Entity]) {
    for &e in nodes {
        let rel = world.get::<RelationShip>(e).unwrap();
        assert!(sibling_list_is_consistent(world, e), "{e:?} has a broken child list");
        assert_eq!(children(world, e).count(), rel.children());
        assert_eq!(backward_count(world, e), rel.children());

        // Walking up must reach a root within the node count.
        let mut current = rel.parent();
        let mut depth = 0;
        while let Some(p) = current {
            depth += 1;
            assert!(depth <= nodes.len(), "{e:?} is its own ancestor");
            current = world.get::<RelationShip>(p).unwrap().parent();
        }
    }
}

#[test]
fn invariants_hold_under_random_reparenting() {
    for seed in [1, 7, 42, 1234] {
        let (mut world, nodes) = forest(12);
        let mut rng = Lcg::new(seed);

        for _ in 0..400 {
            let child = nodes[rng.below(nodes.len())];
            match rng.below(5) {
                0 => remove_from_hierarchy(&mut world, child).unwrap(),
                1 => assign_to_parent(&mut world, None, child).unwrap(),
                _ => {
                    let parent = nodes[rng.below(nodes.len())];
                    let before = snapshot(&world, &nodes);
                    if assign_to_parent(&mut world, Some(parent), child).is_err() {
                        assert_eq!(snapshot(&world, &nodes), before, "rejected reparent mutated links");
                    }
                }
            }
            assert_forest_invariants(&world, &nodes);
        }
    }
}

#[test]
fn reverse_reparent_is_rejected_and_changes_nothing() {
    let (mut world, nodes) = forest(2);
    let (a, b) = (nodes[0], nodes[1]);
    assign_to_parent(&mut world, Some(a), b).unwrap();
    let before = snapshot(&world, &nodes);

    let err = assign_to_parent(&mut world, Some(b), a).unwrap_err();
    assert!(matches!(err, AkkadError::CyclicReparent { .. }));
    assert_eq!(snapshot(&world, &nodes), before);
    assert!(has_child(&world, a, b));
    assert!(has_hierarchy_descendant(&world, a, b));
    assert!(!has_hierarchy_descendant(&world, b, a));
}

#[test]
fn reparent_moves_exactly_one_count() {
    let (mut world, nodes) = forest(6);
    let (p1, p2) = (nodes[0], nodes[1]);
    let (x, moving, y) = (nodes[2], nodes[3], nodes[4]);
    for c in [x, moving, y] {
        assign_to_parent(&mut world, Some(p1), c).unwrap();
    }
    assign_to_parent(&mut world, Some(p2), nodes[5]).unwrap();

    assign_to_parent(&mut world, Some(p2), moving).unwrap();

    let p1_rel = world.get::<RelationShip>(p1).unwrap();
    let p2_rel = world.get::<RelationShip>(p2).unwrap();
    assert_eq!(p1_rel.children(), 2);
    assert_eq!(p2_rel.children(), 2);
    assert_eq!(world.get::<RelationShip>(x).unwrap().next(), Some(y));
    assert_eq!(world.get::<RelationShip>(y).unwrap().prev(), Some(x));
    assert_eq!(p2_rel.last_child(), Some(moving));
}

#[test]
fn direct_child_reassign_is_a_no_op() {
    let (mut world, nodes) = forest(3);
    assign_to_parent(&mut world, Some(nodes[0]), nodes[1]).unwrap();
    assign_to_parent(&mut world, Some(nodes[0]), nodes[2]).unwrap();
    let before = snapshot(&world, &nodes);
    assign_to_parent(&mut world, Some(nodes[0]), nodes[1]).unwrap();
    assert_eq!(snapshot(&world, &nodes), before);
}

#[test]
fn removing_middle_of_three_children() {
    let mut scene = Scene::default();
    let r = scene.add_entity("R");
    let c: Vec<Entity> = ["C1", "C2", "C3"].iter().map(|t| scene.add_entity(*t)).collect();
    for &child in &c {
        scene.assign_to_parent(Some(r), child).unwrap();
    }

    remove_from_hierarchy(scene.world_mut(), c[1]).unwrap();

    let world = scene.world();
    assert_eq!(world.get::<RelationShip>(r).unwrap().children(), 2);
    assert_eq!(world.get::<RelationShip>(c[0]).unwrap().next(), Some(c[2]));
    assert_eq!(world.get::<RelationShip>(c[2]).unwrap().prev(), Some(c[0]));
    assert!(world.get::<RelationShip>(c[1]).unwrap().is_root());
}

#[test]
fn propagation_is_idempotent_across_depth() {
    let (mut world, nodes) = forest(5);
    for pair in nodes.windows(2) {
        assign_to_parent(&mut world, Some(pair[0]), pair[1]).unwrap();
    }
    world.get_mut::<Transform>(nodes[0]).unwrap().rotation = Quat::from_rotation_z(0.3);

    akkad::ecs::propagate_transforms(&mut world);
    let first: Vec<[f32; 16]> = nodes
        .iter()
        .map(|e| world.get::<Transform>(*e).unwrap().matrix().to_cols_array())
        .collect();
    akkad::ecs::propagate_transforms(&mut world);
    let second: Vec<[f32; 16]> = nodes
        .iter()
        .map(|e| world.get::<Transform>(*e).unwrap().matrix().to_cols_array())
        .collect();
    assert_eq!(first, second);

    // Local x offsets 1..=4 accumulate along the root's rotated x axis.
    let leaf = world.get::<Transform>(nodes[4]).unwrap().world_translation();
    let root = world.get::<Transform>(nodes[0]).unwrap().world_translation();
    assert!(((leaf - root).length() - 10.0).abs() < 1e-4);
    let dir = (leaf - root).normalize();
    assert!((dir.x - 0.3f32.cos()).abs() < 1e-4);
    assert!((dir.y - 0.3f32.sin()).abs() < 1e-4);
}
