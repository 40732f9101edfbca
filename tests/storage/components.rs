//! Integration tests for components and migration
//!
//! Tests registration, layouts, set/get, and table migration.

use tabula_foundation::{EntityId, ErrorKind, Id};
use tabula_storage::World;

use crate::pos;

// =============================================================================
// Registration
// =============================================================================

#[test]
fn registration_is_idempotent_by_name() {
    let mut world = World::new();
    let a = world.register_component("Position", 8, 4).unwrap();
    assert_eq!(world.register_component("Position", 8, 4).unwrap(), a);
    assert_eq!(world.lookup("Position"), Some(a));

    let info = world.component_info(a).unwrap();
    assert_eq!(info.layout.size(), 8);
    assert_eq!(info.layout.align(), 4);
}

#[test]
fn redefinition_rejected() {
    let mut world = World::new();
    world.register_component("Position", 8, 4).unwrap();
    let err = world.register_component("Position", 8, 8).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ComponentRedefinition { .. }));
}

#[test]
fn invalid_layouts_rejected() {
    let mut world = World::new();
    for (size, align) in [(8, 3), (6, 4), (64, 64)] {
        let err = world.register_component("Bad", size, align).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidLayout { .. }));
    }
    assert_eq!(world.lookup("Bad"), None);
}

#[test]
fn named_entity_becomes_component() {
    let mut world = World::new();
    let health = world.create_named("Health").unwrap();
    assert!(!world.is_component(health));
    assert_eq!(world.register_component("Health", 4, 4).unwrap(), health);
    assert!(world.is_component(health));
}

#[test]
fn pair_layout_prefers_relation() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let distance = world.register_component("Distance", 4, 4).unwrap();
    let likes = world.register_tag("Likes").unwrap();
    let bob = world.create();

    assert_eq!(world.size_of(Id::pair(distance, position)).unwrap(), 4);
    assert_eq!(world.size_of(Id::pair(likes, position)).unwrap(), 8);
    assert!(world.size_of(Id::pair(likes, bob)).is_err());
    assert!(world.size_of(Id::pair(EntityId::IS_A, position)).is_err());
}

// =============================================================================
// Set / Get
// =============================================================================

#[test]
fn position_scenario() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let e = world.create();
    world.set(e, position, &pos(10, 20)).unwrap();

    assert_eq!(world.get(e, position).unwrap(), Some(&pos(10, 20)[..]));
    assert_eq!(world.type_str(e).unwrap(), "Position");

    world.get_mut(e, position).unwrap().unwrap()[..4].copy_from_slice(&11i32.to_le_bytes());
    assert_eq!(world.get(e, position).unwrap(), Some(&pos(11, 20)[..]));
}

#[test]
fn get_absent_is_none() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let e = world.create();
    assert_eq!(world.get(e, position).unwrap(), None);
    assert_eq!(world.get_mut(e, position).unwrap(), None);
}

#[test]
fn set_on_tag_is_unknown_component() {
    let mut world = World::new();
    let enemy = world.register_tag("Enemy").unwrap();
    let e = world.create();
    let err = world.set(e, enemy, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownComponent(_)));
    assert!(!world.has(e, enemy));
}

#[test]
fn add_and_remove_are_idempotent() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let e = world.create();
    world.set(e, position, &pos(5, 5)).unwrap();
    world.add(e, position).unwrap();
    assert_eq!(world.get(e, position).unwrap(), Some(&pos(5, 5)[..]));

    world.remove(e, position).unwrap();
    world.remove(e, position).unwrap();
    assert!(!world.has(e, position));
}

// =============================================================================
// Migration
// =============================================================================

#[test]
fn migration_keeps_columns_in_lockstep() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let velocity = world.register_component("Velocity", 8, 4).unwrap();
    let mass = world.register_component("Mass", 4, 4).unwrap();

    let entities: Vec<EntityId> = (0..10).map(|_| world.create()).collect();
    for (i, e) in (0..).zip(&entities) {
        world.set(*e, position, &pos(i, i)).unwrap();
        if i % 2 == 0 {
            world.add(*e, velocity).unwrap();
        }
        if i % 3 == 0 {
            world.set(*e, mass, &i.to_le_bytes()).unwrap();
        }
    }
    world.remove(entities[0], velocity).unwrap();
    world.destroy(entities[3]).unwrap();

    for table in world.tables().iter() {
        for column in table.columns() {
            assert_eq!(column.len(), table.len());
        }
        for &e in table.entities() {
            assert_eq!(world.location(e).unwrap().table, table.id());
        }
    }
    for (i, e) in (0..).zip(&entities) {
        if i != 3 {
            assert_eq!(world.get(*e, position).unwrap(), Some(&pos(i, i)[..]));
        }
    }
}

#[test]
fn column_writes_keep_row_count() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let a = world.create();
    let b = world.create();
    world.set(a, position, &pos(1, 1)).unwrap();
    world.set(b, position, &pos(2, 2)).unwrap();
    let table = world.location(b).unwrap().table;

    let bytes = world.column_mut(table, 0).unwrap();
    assert_eq!(bytes.len(), 16);
    bytes[8..].copy_from_slice(&pos(7, 7));
    assert!(world.column_mut(table, 1).is_none());

    let table = world.table(table).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.columns()[0].len(), 2);
    assert_eq!(world.get(a, position).unwrap(), Some(&pos(1, 1)[..]));
    assert_eq!(world.get(b, position).unwrap(), Some(&pos(7, 7)[..]));
}

#[test]
fn type_is_sorted_and_deduplicated() {
    let mut world = World::new();
    let a = world.register_tag("A").unwrap();
    let b = world.register_tag("B").unwrap();
    let e = world.create();
    world.add(e, b).unwrap();
    world.add(e, a).unwrap();
    world.add(e, b).unwrap();

    assert_eq!(world.type_of(e).unwrap().ids(), &[Id::entity(a), Id::entity(b)]);
}
