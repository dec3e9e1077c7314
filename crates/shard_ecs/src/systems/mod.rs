//! # Systems
//!
//! Per-tick processing units. The world hands every system the entities
//! owning all of its required kinds, in registration order, once per tick.
//!
//! A system never aborts the tick: when one entity carries missing or
//! invalid data, the system logs it and moves on to the next entity.

mod combat;
mod health;
mod movement;
mod parallel;

pub use combat::CombatSystem;
pub use health::HealthSystem;
pub use movement::{integrate, MovementSystem, Step};
pub use parallel::ParallelMovementSystem;

use crate::ecs::{ComponentKind, EntityId, World};
use crate::error::EcsResult;
use crate::sync::WorkerPool;

/// A per-tick processing unit.
///
/// # Example
///
/// ```rust
/// use shard_ecs::{ComponentKind, Component, EntityId, Health, System, World};
///
/// const REQUIRED: [ComponentKind; 1] = [Health::KIND];
///
/// struct CountAlive(usize);
///
/// impl System for CountAlive {
///     fn required_components(&self) -> &[ComponentKind] {
///         &REQUIRED
///     }
///
///     fn update(&mut self, _world: &World, _delta_time: f32, entities: &[EntityId]) {
///         self.0 = entities.len();
///     }
/// }
/// ```
pub trait System: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Kinds an entity must own to be passed to [`System::update`].
    ///
    /// Read once, at registration.
    fn required_components(&self) -> &[ComponentKind];

    /// Processes one tick.
    ///
    /// `entities` is sorted by id and valid for this call only. Entities
    /// destroyed concurrently surface as
    /// [`EcsError::UnknownEntity`](crate::EcsError::UnknownEntity) from
    /// world lookups and must be skipped.
    fn update(&mut self, world: &World, delta_time: f32, entities: &[EntityId]);

    /// Releases resources. Called once by [`World::shutdown_systems`].
    fn shutdown(&mut self) {}
}

/// A system that fans its per-entity work out to a [`WorkerPool`].
///
/// Implementors still decide how to partition the work inside
/// [`System::update`]; this trait only names the pool they own and gives
/// them submission and shutdown in terms of it.
pub trait PooledSystem: System {
    /// The pool backing this system.
    fn pool(&self) -> &WorkerPool;

    /// Mutable access to the pool, used to close it.
    fn pool_mut(&mut self) -> &mut WorkerPool;

    /// Queues one unit of work on the pool.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::WorkerPoolClosed`](crate::EcsError::WorkerPoolClosed)
    /// once the pool has been closed.
    fn submit<F>(&self, job: F) -> EcsResult<()>
    where
        F: FnOnce() + Send + 'static,
        Self: Sized,
    {
        self.pool().execute(job)
    }

    /// Drains queued work and joins the workers. Safe to call twice.
    fn close_pool(&mut self) {
        self.pool_mut().close();
    }
}
