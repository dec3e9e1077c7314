//! # Entity Component System
//!
//! A concurrency-safe ECS data store.
//!
//! ## Design Philosophy
//!
//! - Components of one kind live in a dense array with swap removal
//! - Entity IDs are monotonic and never reused
//! - Each entity carries a growable bitmask of the kinds it owns
//! - Dynamic dispatch only at the array and system boundaries

mod component;
mod component_set;
mod entity;
mod storage;
mod world;

pub use component::{Combat, Component, ComponentKind, Health, Movement, Position, Velocity};
pub use component_set::ComponentSet;
pub use entity::EntityId;
pub use storage::ComponentArray;
pub use world::{World, WorldStats};
