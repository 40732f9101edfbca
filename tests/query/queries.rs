//! Integration tests for cached queries
//!
//! Tests that a query tracks world changes and agrees with a fresh filter.

use proptest::prelude::*;
use tabula_foundation::EntityId;
use tabula_query::{Filter, Query, Term};
use tabula_storage::World;

use crate::pos;

// =============================================================================
// Incremental Updates
// =============================================================================

#[test]
fn query_tracks_new_tables() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let velocity = world.register_component("Velocity", 8, 4).unwrap();
    let mut query = Query::new(&mut world, vec![Term::new(position)]).unwrap();
    assert_eq!(query.count(&world).unwrap(), 0);

    let a = world.create_with(position).unwrap();
    let b = world.create_with(velocity).unwrap();
    world.add(b, position).unwrap();

    assert_eq!(query.entities(&world).unwrap(), vec![a, b]);
}

#[test]
fn query_tracks_prototype_changes() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let base = world.prefab(Some("Ship")).unwrap();
    let e = world.create();
    world.is_a(e, base).unwrap();

    let mut query = Query::new(&mut world, vec![Term::new(position)]).unwrap();
    assert_eq!(query.count(&world).unwrap(), 0);

    world.set(base, position, &pos(1, 2)).unwrap();
    assert_eq!(query.entities(&world).unwrap(), vec![e]);

    world.destroy(base).unwrap();
    assert_eq!(query.count(&world).unwrap(), 0);
}

#[test]
fn query_and_filter_iterate_identically() {
    let mut world = World::new();
    let position = world.register_component("Position", 8, 4).unwrap();
    let velocity = world.register_component("Velocity", 8, 4).unwrap();
    let filter = Filter::builder()
        .with(position)
        .optional(velocity)
        .instanced(false)
        .build();
    let mut query = Query::from_filter(&mut world, &filter).unwrap();

    let base = world.prefab(None).unwrap();
    world.set(base, velocity, &pos(0, 1)).unwrap();
    for i in 0..4 {
        let e = world.create();
        world.set(e, position, &pos(i, i)).unwrap();
        if i % 2 == 0 {
            world.is_a(e, base).unwrap();
        }
    }

    let collect = |it: &mut tabula_query::Iter, world: &World| {
        let mut seen = Vec::new();
        while it.next(world).unwrap() {
            seen.push((it.entities(world).unwrap().to_vec(), it.is_set(world, 1).unwrap()));
        }
        seen
    };
    let from_filter = collect(&mut filter.iter(&world).unwrap(), &world);
    let from_query = collect(&mut query.iter(&world).unwrap(), &world);
    assert_eq!(from_filter, from_query);
    assert_eq!(from_filter.len(), 3);
}

// =============================================================================
// Equivalence Under Random Changes
// =============================================================================

#[derive(Clone, Debug)]
enum Step {
    Spawn(u8),
    Toggle(usize, u8),
    Inherit(usize, usize),
    Destroy(usize),
    Name(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<u8>().prop_map(Step::Spawn),
        (any::<usize>(), any::<u8>()).prop_map(|(e, c)| Step::Toggle(e, c)),
        (any::<usize>(), any::<usize>()).prop_map(|(e, p)| Step::Inherit(e, p)),
        any::<usize>().prop_map(Step::Destroy),
        any::<usize>().prop_map(Step::Name),
    ]
}

proptest! {
    #[test]
    fn cached_query_equals_fresh_filter(steps in prop::collection::vec(step(), 1..80)) {
        let mut world = World::new();
        let ids = [
            world.register_component("Position", 8, 4).unwrap(),
            world.register_component("Velocity", 8, 4).unwrap(),
            world.register_tag("Enemy").unwrap(),
        ];
        let filters = [
            Filter::builder().with(ids[0]).build(),
            Filter::builder().with(ids[0]).without(ids[2]).build(),
            Filter::builder().inherit(ids[1]).optional(ids[2]).build(),
            Filter::builder().own(ids[0]).with(ids[1]).filter_only(EntityId::PREFAB).build(),
        ];
        let mut queries: Vec<Query> = filters
            .iter()
            .map(|filter| Query::from_filter(&mut world, filter).unwrap())
            .collect();
        let mut live: Vec<EntityId> = Vec::new();

        for step in steps {
            match step {
                Step::Spawn(kind) => {
                    let e = if kind % 3 == 0 {
                        world.prefab(None).unwrap()
                    } else {
                        world.create()
                    };
                    live.push(e);
                }
                Step::Toggle(e, c) if !live.is_empty() => {
                    let e = live[e % live.len()];
                    let id = ids[usize::from(c) % ids.len()];
                    if world.owns(e, id) {
                        world.remove(e, id).unwrap();
                    } else {
                        world.add(e, id).unwrap();
                    }
                }
                Step::Inherit(e, p) if !live.is_empty() => {
                    let e = live[e % live.len()];
                    let p = live[p % live.len()];
                    let _ = world.is_a(e, p);
                }
                Step::Destroy(e) if !live.is_empty() => {
                    let e = live.swap_remove(e % live.len());
                    world.destroy(e).unwrap();
                }
                Step::Name(e) if !live.is_empty() => {
                    let e = live[e % live.len()];
                    let _ = world.set_name(e, "named");
                }
                _ => {}
            }
            live.retain(|e| world.is_alive(*e));

            for (filter, query) in filters.iter().zip(queries.iter_mut()) {
                let fresh = filter.matches(&world).unwrap();
                prop_assert_eq!(query.matches(&world).unwrap(), &fresh[..]);
            }
        }
    }
}
