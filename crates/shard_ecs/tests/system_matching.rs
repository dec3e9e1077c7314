//! The entity list a system receives equals the intersection of the
//! arrays for its required kinds, over a large random population.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shard_ecs::{
    Component, ComponentKind, EngineConfig, EntityId, Health, Position, System, Velocity, World,
};

const POPULATION: usize = 12_000;

/// Far past the first bitmask word.
#[derive(Clone, Debug)]
struct Marker;

impl Component for Marker {
    const KIND: ComponentKind = ComponentKind::new(190);
}

struct Capture {
    required: Vec<ComponentKind>,
    seen: Arc<Mutex<Vec<EntityId>>>,
}

impl System for Capture {
    fn required_components(&self) -> &[ComponentKind] {
        &self.required
    }

    fn update(&mut self, _world: &World, _delta_time: f32, entities: &[EntityId]) {
        *self.seen.lock() = entities.to_vec();
    }
}

fn register(world: &World, required: Vec<ComponentKind>) -> Arc<Mutex<Vec<EntityId>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    world
        .add_system(Capture {
            required,
            seen: Arc::clone(&seen),
        })
        .unwrap();
    seen
}

#[test]
fn test_matching_equals_intersection() {
    let config = EngineConfig {
        initial_entity_capacity: POPULATION,
        ..EngineConfig::default()
    };
    let world = World::with_config(config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let mut with_position = BTreeSet::new();
    let mut with_velocity = BTreeSet::new();
    let mut with_marker = BTreeSet::new();
    for _ in 0..POPULATION {
        let id = world.create_entity();
        if rng.gen_bool(0.5) {
            world.add_component(id, Position::default()).unwrap();
            with_position.insert(id);
        }
        if rng.gen_bool(0.6) {
            world.add_component(id, Velocity::default()).unwrap();
            with_velocity.insert(id);
        }
        if rng.gen_bool(0.1) {
            world.add_component(id, Marker).unwrap();
            with_marker.insert(id);
        }
        if rng.gen_bool(0.3) {
            world.add_component(id, Health::full(1.0)).unwrap();
        }
    }

    let pairs = register(&world, vec![Position::KIND, Velocity::KIND]);
    let triples = register(&world, vec![Position::KIND, Velocity::KIND, Marker::KIND]);
    let everyone = register(&world, Vec::new());

    world.update(0.016);

    let expected_pairs: Vec<EntityId> = with_position.intersection(&with_velocity).copied().collect();
    assert!(expected_pairs.len() > 1_000);
    assert_eq!(*pairs.lock(), expected_pairs);

    let expected_triples: Vec<EntityId> = expected_pairs
        .iter()
        .filter(|id| with_marker.contains(id))
        .copied()
        .collect();
    assert_eq!(*triples.lock(), expected_triples);

    assert_eq!(everyone.lock().len(), POPULATION);
    assert_eq!(world.query(&[Position::KIND, Velocity::KIND]).unwrap(), expected_pairs);
}

#[test]
fn test_matching_tracks_removals_between_ticks() {
    let world = World::new();
    let seen = register(&world, vec![Position::KIND, Velocity::KIND]);

    let ids: Vec<EntityId> = (0..100).map(|_| world.create_entity()).collect();
    for &id in &ids {
        world.add_component(id, Position::default()).unwrap();
        world.add_component(id, Velocity::default()).unwrap();
    }
    world.update(0.016);
    assert_eq!(*seen.lock(), ids);

    for &id in ids.iter().step_by(3) {
        world.remove_component::<Velocity>(id).unwrap();
    }
    world.destroy_entity(ids[1]);
    world.update(0.016);

    let expected: Vec<EntityId> = ids
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 0 && *i != 1)
        .map(|(_, id)| *id)
        .collect();
    assert_eq!(*seen.lock(), expected);
}
