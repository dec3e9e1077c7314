//! Movement integration fanned out to a [`WorkerPool`].
//!
//! ```text
//! tick thread: gather batches    ──► submit() to the pool
//! workers:     integrate(batch)  ──► result channel
//! tick thread: drain results     ──► write back through the World
//! ```
//!
//! Workers only see copied inputs; every mutation goes through the world
//! on the tick thread.

use crossbeam_channel::unbounded;

use crate::config::EngineConfig;
use crate::ecs::{Component, ComponentKind, EntityId, Movement, Position, Velocity, World};
use crate::error::EcsResult;
use crate::sync::WorkerPool;

use super::movement::{apply, gather, integrate, Step};
use super::{PooledSystem, System};

const REQUIRED: [ComponentKind; 3] = [Position::KIND, Velocity::KIND, Movement::KIND];

/// Entities per job unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

type Snapshot = (EntityId, Position, Velocity, Movement);
type Results = Vec<(EntityId, Step)>;

/// Must return exactly one result per snapshot.
type BatchFn = fn(Vec<Snapshot>, f32) -> Results;

/// Same semantics as [`MovementSystem`](super::MovementSystem), with the
/// arithmetic spread over worker threads.
pub struct ParallelMovementSystem {
    pool: WorkerPool,
    batch_size: usize,
    moved: usize,
    skipped: usize,
}

impl ParallelMovementSystem {
    /// Wraps an existing pool. `batch_size` of zero is treated as one.
    #[must_use]
    pub fn new(pool: WorkerPool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
            moved: 0,
            skipped: 0,
        }
    }

    /// Starts a pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::from_config`].
    pub fn from_config(config: &EngineConfig) -> EcsResult<Self> {
        Ok(Self::new(WorkerPool::from_config(config)?, DEFAULT_BATCH_SIZE))
    }

    /// Entities moved during the last tick.
    #[must_use]
    pub fn moved_last_tick(&self) -> usize {
        self.moved
    }

    /// Entities skipped during the last tick.
    #[must_use]
    pub fn skipped_last_tick(&self) -> usize {
        self.skipped
    }

    fn integrate_batch(batch: Vec<Snapshot>, delta_time: f32) -> Results {
        batch
            .into_iter()
            .map(|(id, position, velocity, movement)| {
                (id, integrate(position, velocity, movement, delta_time))
            })
            .collect()
    }

    /// Snapshots every matched entity, split into batches in one pass.
    fn gather_batches(&mut self, world: &World, entities: &[EntityId]) -> Vec<Vec<Snapshot>> {
        let mut batches = Vec::with_capacity(entities.len().div_ceil(self.batch_size));
        let mut current = Vec::new();
        for &id in entities {
            let Some((position, velocity, movement)) = gather(world, id) else {
                self.skipped += 1;
                continue;
            };
            if current.is_empty() {
                current.reserve_exact(self.batch_size.min(entities.len()));
            }
            current.push((id, position, velocity, movement));
            if current.len() == self.batch_size {
                batches.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    fn run(&mut self, world: &World, delta_time: f32, entities: &[EntityId], step_batch: BatchFn) {
        self.moved = 0;
        self.skipped = 0;
        let batches = self.gather_batches(world, entities);

        let (result_tx, result_rx) = unbounded();
        let mut inline = Vec::new();
        let mut submitted = 0;
        for batch in batches {
            if self.pool.is_closed() {
                inline.push(step_batch(batch, delta_time));
                continue;
            }
            let len = batch.len();
            let tx = result_tx.clone();
            let queued = self.submit(move || {
                // A closed receiver only means the tick gave up on results.
                let _ = tx.send(step_batch(batch, delta_time));
            });
            match queued {
                Ok(()) => submitted += len,
                Err(err) => {
                    tracing::warn!(%err, entities = len, "movement batch dropped");
                    self.skipped += len;
                }
            }
        }
        if !inline.is_empty() {
            tracing::debug!(batches = inline.len(), "worker pool closed, integrated inline");
        }
        drop(result_tx);

        // Ends once every job has finished (or panicked) and dropped its sender.
        let mut received = 0;
        for results in result_rx.iter() {
            received += results.len();
            for (id, step) in results {
                self.record(world, id, step);
            }
        }
        let lost = submitted.saturating_sub(received);
        if lost > 0 {
            tracing::warn!(entities = lost, "movement batch panicked, entities skipped");
            self.skipped += lost;
        }

        for results in inline {
            for (id, step) in results {
                self.record(world, id, step);
            }
        }
    }

    fn record(&mut self, world: &World, id: EntityId, step: Step) {
        match step {
            Step::Moved(position, velocity) => match apply(world, id, position, velocity) {
                Ok(()) => self.moved += 1,
                Err(err) => {
                    tracing::trace!(entity = %id, %err, "entity vanished mid-update");
                    self.skipped += 1;
                }
            },
            Step::Stationary => {}
            Step::Invalid(reason) => {
                tracing::warn!(entity = %id, reason, "skipping entity with invalid movement data");
                self.skipped += 1;
            }
        }
    }
}

impl System for ParallelMovementSystem {
    fn name(&self) -> &'static str {
        "parallel_movement"
    }

    fn required_components(&self) -> &[ComponentKind] {
        &REQUIRED
    }

    fn update(&mut self, world: &World, delta_time: f32, entities: &[EntityId]) {
        self.run(world, delta_time, entities, Self::integrate_batch);
    }

    fn shutdown(&mut self) {
        self.close_pool();
    }
}

impl PooledSystem for ParallelMovementSystem {
    fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    fn pool_mut(&mut self) -> &mut WorkerPool {
        &mut self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::MovementSystem;

    fn populate(world: &World, count: usize) -> Vec<EntityId> {
        (0..count)
            .map(|i| {
                let id = world.create_entity();
                let f = f32::from(u16::try_from(i % 100).unwrap());
                world.add_component(id, Position::new(f, 0.0, 0.0)).unwrap();
                world.add_component(id, Velocity::new(1.0, f, 0.0)).unwrap();
                world
                    .add_component(
                        id,
                        Movement {
                            max_speed: 10.0,
                            is_moving: i % 7 != 0,
                        },
                    )
                    .unwrap();
                id
            })
            .collect()
    }

    #[test]
    fn test_matches_sequential_system() {
        let sequential = World::new();
        let parallel = World::new();
        let ids_a = populate(&sequential, 500);
        let ids_b = populate(&parallel, 500);

        let mut seq = MovementSystem::new();
        seq.update(&sequential, 0.5, &ids_a);

        let mut par = ParallelMovementSystem::new(WorkerPool::new(3, 4).unwrap(), 64);
        par.update(&parallel, 0.5, &ids_b);

        assert_eq!(par.moved_last_tick(), seq.moved_last_tick());
        for (a, b) in ids_a.iter().zip(&ids_b) {
            assert_eq!(
                sequential.get_component::<Position>(*a).unwrap(),
                parallel.get_component::<Position>(*b).unwrap()
            );
            assert_eq!(
                sequential.get_component::<Velocity>(*a).unwrap(),
                parallel.get_component::<Velocity>(*b).unwrap()
            );
        }
    }

    #[test]
    fn test_falls_back_inline_after_shutdown() {
        let world = World::new();
        let ids = populate(&world, 10);
        let mut system = ParallelMovementSystem::new(WorkerPool::new(2, 2).unwrap(), 3);
        system.shutdown();
        assert!(system.pool().is_closed());

        system.update(&world, 1.0, &ids);
        // i % 7 == 0 is stationary: ids 0 and 7.
        assert_eq!(system.moved_last_tick(), 8);
    }

    fn panic_on_fourth(batch: Vec<Snapshot>, delta_time: f32) -> Results {
        let marked = batch
            .iter()
            .any(|(_, position, ..)| (position.x - 4.0).abs() < f32::EPSILON);
        assert!(!marked, "corrupt batch");
        ParallelMovementSystem::integrate_batch(batch, delta_time)
    }

    #[test]
    fn test_panicked_batch_counts_as_skipped() {
        let world = World::new();
        let ids = populate(&world, 10);
        let mut system = ParallelMovementSystem::new(WorkerPool::new(2, 4).unwrap(), 3);

        system.run(&world, 1.0, &ids, panic_on_fourth);

        // Batch [3, 4, 5] is lost; ids 0 and 7 are stationary.
        assert_eq!(system.skipped_last_tick(), 3);
        assert_eq!(system.moved_last_tick(), 5);
        for &id in &ids[3..6] {
            let position = world.get_component::<Position>(id).unwrap().unwrap();
            assert!(position.y.abs() < f32::EPSILON);
        }
        system.shutdown();
    }

    #[test]
    fn test_batches_split_in_order() {
        let world = World::new();
        let ids = populate(&world, 10);
        let mut system = ParallelMovementSystem::new(WorkerPool::new(1, 1).unwrap(), 3);

        let batches = system.gather_batches(&world, &ids);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        let flattened: Vec<EntityId> = batches.iter().flatten().map(|(id, ..)| *id).collect();
        assert_eq!(flattened, ids);
    }
}
