//! # Shard ECS
//!
//! Concurrency-safe Entity Component System for the game-server fleet,
//! designed for:
//! - Tens of thousands of live entities per world
//! - Sub-50ms tick budgets
//! - One `World` per game shard, shared between the tick thread and
//!   collaborator services
//!
//! ## Architecture Rules
//!
//! 1. **Dense storage** - One contiguous array per component kind, O(1)
//!    swap removal
//! 2. **Bitmask membership** - Each entity carries a growable set of kinds;
//!    system matching is a word-wise subset test
//! 3. **Sequential ticks** - Systems run in registration order; parallelism
//!    lives inside a system via [`WorkerPool`]
//! 4. **No panics for expected conditions** - Stale ids come back as
//!    [`EcsError::UnknownEntity`]
//!
//! ## Example
//!
//! ```rust
//! use shard_ecs::{HealthSystem, Health, World};
//!
//! let world = World::new();
//! world.add_system(HealthSystem::new())?;
//!
//! let e = world.create_entity();
//! world.add_component(e, Health { current: 120.0, max: 100.0 })?;
//! world.update(0.05);
//!
//! assert_eq!(world.get_component::<Health>(e)?, Some(Health::full(100.0)));
//! # Ok::<(), shard_ecs::EcsError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod sync;
pub mod systems;

pub use config::EngineConfig;
pub use ecs::{
    Combat, Component, ComponentArray, ComponentKind, ComponentSet, EntityId, Health, Movement,
    Position, Velocity, World, WorldStats,
};
pub use error::{EcsError, EcsResult};
pub use sync::WorkerPool;
pub use systems::{
    integrate, CombatSystem, HealthSystem, MovementSystem, ParallelMovementSystem, PooledSystem,
    Step, System,
};
