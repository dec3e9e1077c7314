//! # ECS Tick Benchmark
//!
//! REQUIREMENTS:
//! - 50,000 live entities per shard
//! - < 50ms per tick with the reference systems
//!
//! Run with: `cargo bench --package shard_ecs`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shard_ecs::{
    Component, ComponentArray, EntityId, Health, HealthSystem, Movement, MovementSystem,
    ParallelMovementSystem, Position, Velocity, WorkerPool, World,
};

/// Entities per shard the tick budget is sized for.
const ENTITY_COUNT: usize = 50_000;

fn populated_world(count: usize) -> World {
    let world = World::new();
    for i in 0..count {
        let id = world.create_entity();
        let f = (i % 1000) as f32;
        world.add_component(id, Position::new(f, f, f)).unwrap();
        world.add_component(id, Velocity::new(0.1, 0.2, 0.3)).unwrap();
        world
            .add_component(
                id,
                Movement {
                    max_speed: 1.0,
                    is_moving: true,
                },
            )
            .unwrap();
        if i % 2 == 0 {
            world.add_component(id, Health { current: 120.0, max: 100.0 }).unwrap();
        }
    }
    world
}

/// Benchmark: Create entities with three components each.
fn bench_populate(c: &mut Criterion) {
    let mut group = c.benchmark_group("populate");

    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(populated_world(count).entity_count()));
        });
    }

    group.finish();
}

/// THE CRITICAL BENCHMARK: one tick over a full shard.
fn bench_tick(c: &mut Criterion) {
    let world = populated_world(ENTITY_COUNT);
    world.add_system(MovementSystem::new()).unwrap();
    world.add_system(HealthSystem::new()).unwrap();

    c.bench_function("CRITICAL_tick_50K_sequential", |b| {
        b.iter(|| {
            world.update(0.016);
            black_box(world.ticks())
        });
    });
}

/// Benchmark: the same tick with movement on the worker pool.
fn bench_tick_parallel(c: &mut Criterion) {
    let world = populated_world(ENTITY_COUNT);
    let pool = WorkerPool::new(4, 64).unwrap();
    world.add_system(ParallelMovementSystem::new(pool, 2_048)).unwrap();
    world.add_system(HealthSystem::new()).unwrap();

    c.bench_function("tick_50K_parallel_movement", |b| {
        b.iter(|| {
            world.update(0.016);
            black_box(world.ticks())
        });
    });

    world.shutdown_systems();
}

/// Benchmark: system matching alone.
fn bench_query(c: &mut Criterion) {
    let world = populated_world(ENTITY_COUNT);

    c.bench_function("query_50K_position_velocity", |b| {
        b.iter(|| black_box(world.query(&[Position::KIND, Velocity::KIND]).unwrap().len()));
    });
}

/// Benchmark: raw array add / swap-remove churn.
fn bench_array_churn(c: &mut Criterion) {
    let ids: Vec<EntityId> = (1..=100_000).map(EntityId::from_raw).collect();

    c.bench_function("array_add_remove_100K", |b| {
        b.iter(|| {
            let mut array: ComponentArray<Position> = ComponentArray::with_capacity(ids.len());
            for &id in &ids {
                array.add(id, Position::default());
            }
            for &id in ids.iter().step_by(2) {
                array.remove(id);
            }
            black_box(array.size())
        });
    });
}

/// Benchmark: entity create/destroy cycle.
fn bench_create_destroy_cycle(c: &mut Criterion) {
    let world = populated_world(ENTITY_COUNT);
    let mut ids = world.query(&[]).unwrap();

    c.bench_function("create_destroy_cycle_10K", |b| {
        b.iter(|| {
            for id in ids.iter().take(10_000) {
                world.destroy_entity(*id);
            }
            for id in ids.iter_mut().take(10_000) {
                *id = world.create_entity();
                world.add_component(*id, Position::default()).unwrap();
            }
            black_box(world.entity_count())
        });
    });
}

criterion_group!(
    benches,
    bench_populate,
    bench_tick,
    bench_tick_parallel,
    bench_query,
    bench_array_churn,
    bench_create_destroy_cycle,
);

criterion_main!(benches);
