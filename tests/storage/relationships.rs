//! Integration tests for relationships
//!
//! Tests pairs, the ChildOf hierarchy, destroy cascades, relation policies,
//! and IsA inheritance.

use tabula_foundation::{EntityId, ErrorKind, Id};
use tabula_storage::{OnDelete, RelationPolicy, World};

use crate::pos;

// =============================================================================
// Pairs
// =============================================================================

#[test]
fn pairs_are_ids() {
    let mut world = World::new();
    let likes = world.register_tag("Likes").unwrap();
    let alice = world.create();
    let bob = world.create();
    world.add_pair(alice, likes, bob).unwrap();

    assert!(world.has_pair(alice, likes, bob));
    assert!(!world.has_pair(bob, likes, alice));
    assert!(world.type_of(alice).unwrap().contains(Id::pair(likes, bob)));

    world.remove_pair(alice, likes, bob).unwrap();
    assert!(!world.has_pair(alice, likes, bob));
}

#[test]
fn pair_with_data() {
    let mut world = World::new();
    let distance = world.register_component("Distance", 4, 4).unwrap();
    let sun = world.create();
    let earth = world.create();
    world.set_pair(earth, distance, sun, &150i32.to_le_bytes()).unwrap();

    assert_eq!(
        world.get_pair(earth, distance, sun).unwrap(),
        Some(&150i32.to_le_bytes()[..])
    );
}

#[test]
fn user_relation_can_be_exclusive() {
    let mut world = World::new();
    let faction = world.create();
    world
        .set_relation_policy(faction, RelationPolicy::new().with_exclusive(true))
        .unwrap();
    let red = world.create();
    let blue = world.create();
    let unit = world.create();

    world.add_pair(unit, faction, red).unwrap();
    world.add_pair(unit, faction, blue).unwrap();
    assert!(world.has_pair(unit, faction, blue));
    assert!(!world.has_pair(unit, faction, red));
    assert_eq!(world.type_of(unit).unwrap().len(), 1);
}

#[test]
fn builtin_policies_are_protected() {
    let mut world = World::new();
    let err = world
        .set_relation_policy(EntityId::CHILD_OF, RelationPolicy::new())
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ProtectedEntity(_)));
    assert_eq!(world.relation_policy(EntityId::CHILD_OF), RelationPolicy::hierarchy());
}

// =============================================================================
// Hierarchy
// =============================================================================

#[test]
fn children_in_attach_order() {
    let mut world = World::new();
    let parent = world.create();
    let kids: Vec<EntityId> = (0..3).map(|_| world.create()).collect();
    for kid in &kids {
        world.add_child(parent, *kid).unwrap();
    }
    assert_eq!(world.children(parent), kids);
    assert!(kids.iter().all(|kid| world.parent(*kid) == Some(parent)));
}

#[test]
fn type_str_shows_names() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let sun = world.create_named("Sun").unwrap();
    let earth = world.create();
    world.set(earth, position, &pos(1, 0)).unwrap();
    world.add_child(sun, earth).unwrap();

    assert_eq!(world.type_str(earth).unwrap(), "Position, (ChildOf,Sun)");
}

#[test]
fn reparenting_checks_names() {
    let mut world = World::new();
    let a = world.create();
    let b = world.create();
    let first = world.create();
    world.add_child(a, first).unwrap();
    world.set_name(first, "probe").unwrap();
    let second = world.create();
    world.add_child(b, second).unwrap();
    world.set_name(second, "probe").unwrap();

    let err = world.add_child(a, second).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateName(_)));
    assert_eq!(world.parent(second), Some(b));
    assert_eq!(world.lookup_child(b, "probe"), Some(second));
}

#[test]
fn leaving_parent_moves_name_to_root() {
    let mut world = World::new();
    let parent = world.create();
    let child = world.create();
    world.add_child(parent, child).unwrap();
    world.set_name(child, "wanderer").unwrap();
    assert_eq!(world.lookup("wanderer"), None);

    world.remove_pair(child, EntityId::CHILD_OF, parent).unwrap();
    assert_eq!(world.lookup("wanderer"), Some(child));
    assert_eq!(world.lookup_child(parent, "wanderer"), None);
}

// =============================================================================
// Destroy Cascades
// =============================================================================

#[test]
fn cascade_destroys_children_last_attached_first() {
    let mut world = World::new();
    let parent = world.create();
    let kids: Vec<EntityId> = (0..3).map(|_| world.create()).collect();
    for kid in &kids {
        world.add_child(parent, *kid).unwrap();
    }

    let destroyed = world.destroy(parent).unwrap();
    assert_eq!(destroyed, vec![kids[2], kids[1], kids[0], parent]);
    assert!(destroyed.iter().all(|e| !world.is_alive(*e)));
}

#[test]
fn cascade_is_depth_first_post_order() {
    let mut world = World::new();
    let root = world.create();
    let a = world.create();
    let b = world.create();
    let a1 = world.create();
    let a2 = world.create();
    world.add_child(root, a).unwrap();
    world.add_child(root, b).unwrap();
    world.add_child(a, a1).unwrap();
    world.add_child(a, a2).unwrap();

    assert_eq!(world.destroy(root).unwrap(), vec![b, a2, a1, a, root]);
}

#[test]
fn destroy_removes_references() {
    let mut world = World::new();
    let likes = world.register_tag("Likes").unwrap();
    let victim = world.create();
    let fan = world.create();
    world.add_pair(fan, likes, victim).unwrap();
    world.add(fan, victim).unwrap();

    assert_eq!(world.destroy(victim).unwrap(), vec![victim]);
    assert!(world.is_alive(fan));
    assert!(world.type_of(fan).unwrap().is_empty());
}

#[test]
fn destroying_relation_removes_its_pairs() {
    let mut world = World::new();
    let likes = world.create();
    let alice = world.create();
    let bob = world.create();
    world.add_pair(alice, likes, bob).unwrap();

    world.destroy(likes).unwrap();
    assert!(world.is_alive(alice));
    assert!(world.type_of(alice).unwrap().is_empty());
}

#[test]
fn cascade_policy_on_user_relation() {
    let mut world = World::new();
    let owned_by = world.create();
    world
        .set_relation_policy(
            owned_by,
            RelationPolicy::new().with_on_delete(OnDelete::Cascade),
        )
        .unwrap();
    let player = world.create();
    let sword = world.create();
    let shield = world.create();
    world.add_pair(sword, owned_by, player).unwrap();
    world.add_pair(shield, owned_by, player).unwrap();

    assert_eq!(world.destroy(player).unwrap(), vec![shield, sword, player]);
}

#[test]
fn cascade_into_builtin_is_rejected_whole() {
    let mut world = World::new();
    let owned_by = world.create();
    world
        .set_relation_policy(
            owned_by,
            RelationPolicy::new().with_on_delete(OnDelete::Cascade),
        )
        .unwrap();
    let player = world.create();
    let item = world.create();
    world.add_pair(item, owned_by, player).unwrap();
    world.add_pair(EntityId::PREFAB, owned_by, player).unwrap();

    let err = world.destroy(player).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ProtectedEntity(_)));
    assert!(err.context.is_some());
    assert!(world.is_alive(player));
    assert!(world.is_alive(item));
}

// =============================================================================
// Inheritance
// =============================================================================

#[test]
fn inherited_value_is_shared() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let base = world.prefab(Some("Ship")).unwrap();
    world.set(base, position, &pos(1, 1)).unwrap();
    let a = world.create();
    let b = world.create();
    world.is_a(a, base).unwrap();
    world.is_a(b, base).unwrap();

    assert!(world.has(a, position));
    assert!(!world.owns(a, position));
    assert_eq!(world.get(a, position).unwrap(), Some(&pos(1, 1)[..]));

    world.set(base, position, &pos(7, 7)).unwrap();
    assert_eq!(world.get(b, position).unwrap(), Some(&pos(7, 7)[..]));
    assert_eq!(world.prototypes(a), vec![base]);
}

#[test]
fn override_and_restore() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let base = world.prefab(None).unwrap();
    world.set(base, position, &pos(1, 1)).unwrap();
    let e = world.create();
    world.is_a(e, base).unwrap();

    world.set(e, position, &pos(2, 2)).unwrap();
    assert!(world.owns(e, position));
    assert_eq!(world.get(e, position).unwrap(), Some(&pos(2, 2)[..]));
    assert_eq!(world.get(base, position).unwrap(), Some(&pos(1, 1)[..]));

    world.remove(e, position).unwrap();
    assert_eq!(world.get(e, position).unwrap(), Some(&pos(1, 1)[..]));
}

#[test]
fn add_over_inherited_starts_zeroed() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let base = world.prefab(None).unwrap();
    world.set(base, position, &pos(1, 1)).unwrap();
    let e = world.create();
    world.is_a(e, base).unwrap();

    world.add(e, position).unwrap();
    assert_eq!(world.get(e, position).unwrap(), Some(&[0u8; 8][..]));
}

#[test]
fn inheritance_is_transitive() {
    let mut world = World::new();
    let speed = world.register_component("Speed", 4, 4).unwrap();
    let vehicle = world.prefab(None).unwrap();
    world.set(vehicle, speed, &3i32.to_le_bytes()).unwrap();
    let car = world.prefab(None).unwrap();
    world.is_a(car, vehicle).unwrap();
    let mine = world.create();
    world.is_a(mine, car).unwrap();

    assert_eq!(world.resolve_source(mine, Id::entity(speed)).unwrap(), Some(vehicle));
    assert_eq!(world.get(mine, speed).unwrap(), Some(&3i32.to_le_bytes()[..]));
}

#[test]
fn first_prototype_in_type_order_wins() {
    let mut world = World::new();
    let speed = world.register_component("Speed", 4, 4).unwrap();
    let first = world.prefab(None).unwrap();
    let second = world.prefab(None).unwrap();
    world.set(first, speed, &1i32.to_le_bytes()).unwrap();
    world.set(second, speed, &2i32.to_le_bytes()).unwrap();
    let e = world.create();
    world.is_a(e, second).unwrap();
    world.is_a(e, first).unwrap();

    assert_eq!(world.prototypes(e), vec![first, second]);
    assert_eq!(world.get(e, speed).unwrap(), Some(&1i32.to_le_bytes()[..]));
}

#[test]
fn structural_ids_not_inherited() {
    let mut world = World::new();
    let parent = world.create();
    let base = world.prefab(None).unwrap();
    world.add_child(parent, base).unwrap();
    let e = world.create();
    world.is_a(e, base).unwrap();

    assert!(!world.has(e, EntityId::PREFAB));
    assert!(!world.has_pair(e, EntityId::CHILD_OF, parent));
    assert_eq!(world.parent(e), None);
}

#[test]
fn is_a_cycle_rejected() {
    let mut world = World::new();
    let a = world.create();
    let b = world.create();
    let c = world.create();
    world.is_a(b, a).unwrap();
    world.is_a(c, b).unwrap();

    let err = world.is_a(a, c).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IsACycle { .. }));
    assert!(world.prototypes(a).is_empty());
    assert!(matches!(
        world.is_a(a, a).unwrap_err().kind,
        ErrorKind::IsACycle { .. }
    ));
}

#[test]
fn destroyed_prototype_stops_providing() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let base = world.prefab(None).unwrap();
    world.set(base, position, &pos(1, 1)).unwrap();
    let e = world.create();
    world.is_a(e, base).unwrap();

    world.destroy(base).unwrap();
    assert!(world.is_alive(e));
    assert!(!world.has(e, position));
    assert!(world.prototypes(e).is_empty());
}
