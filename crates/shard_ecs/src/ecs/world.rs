//! # ECS World
//!
//! The aggregate root: entity identity, one [`ComponentArray`] per kind,
//! one [`ComponentSet`] per entity, and the ordered system list.
//!
//! ## Locking
//!
//! Every collection has its own lock. When an operation needs more than
//! one, it acquires them in this order:
//!
//! ```text
//! entity registry -> component-set registry -> array map -> single array
//! ```
//!
//! Reads take shared locks. Structural mutation takes exclusive locks on
//! the registries it touches and on ONE array at a time. Destruction holds
//! both registry locks for its whole duration, so no reader ever sees an
//! entity missing from the registry while still stored in an array.
//!
//! Counters are atomics and never contend on the structural locks.

use std::collections::{HashMap, HashSet};
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};

use super::component::{Component, ComponentKind};
use super::component_set::ComponentSet;
use super::entity::{EntityAllocator, EntityId};
use super::storage::{ComponentArray, ErasedArray};
use crate::config::EngineConfig;
use crate::error::{EcsError, EcsResult};
use crate::systems::System;

type ArrayCell = Arc<RwLock<Box<dyn ErasedArray>>>;

/// A system plus the requirement snapshot taken at registration.
struct RegisteredSystem {
    system: Box<dyn System>,
    required: Box<[ComponentKind]>,
    mask: ComponentSet,
}

/// Introspection snapshot for capacity planning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Live entities.
    pub entity_count: usize,
    /// Stored component values across all kinds.
    pub component_count: usize,
    /// Registered systems.
    pub system_count: usize,
    /// Approximate bytes held by values and indexes.
    pub estimated_memory_bytes: usize,
    /// Completed [`World::update`] calls.
    pub ticks: u64,
}

/// The ECS World - container for all game state.
///
/// All operations take `&self`; the world is meant to be shared (for
/// example behind an `Arc`) between the tick thread and collaborator
/// services.
///
/// # Example
///
/// ```rust
/// use shard_ecs::{MovementSystem, Movement, Position, Velocity, World};
///
/// let world = World::new();
/// world.add_system(MovementSystem::new())?;
///
/// let e = world.create_entity();
/// world.add_component(e, Position::new(0.0, 0.0, 0.0))?;
/// world.add_component(e, Velocity::new(1.0, 0.0, 0.0))?;
/// world.add_component(e, Movement { max_speed: 5.0, is_moving: true })?;
///
/// world.update(1.0);
/// assert_eq!(world.get_component::<Position>(e)?, Some(Position::new(1.0, 0.0, 0.0)));
/// # Ok::<(), shard_ecs::EcsError>(())
/// ```
pub struct World {
    config: EngineConfig,
    allocator: EntityAllocator,

    // =========================================================================
    // Structural collections - see the lock order above
    // =========================================================================
    entities: RwLock<HashSet<EntityId>>,
    sets: RwLock<HashMap<EntityId, ComponentSet>>,
    arrays: RwLock<HashMap<ComponentKind, ArrayCell>>,

    // =========================================================================
    // Scheduling
    // =========================================================================
    /// Systems run by `update`. Held for the whole tick.
    systems: Mutex<Vec<RegisteredSystem>>,
    /// Systems registered but not yet picked up by a tick.
    incoming: Mutex<Vec<RegisteredSystem>>,
    /// Thread currently running systems, if any.
    ticking: Mutex<Option<ThreadId>>,

    // =========================================================================
    // Lock-free counters
    // =========================================================================
    entity_count: AtomicUsize,
    component_count: AtomicUsize,
    system_count: AtomicUsize,
    ticks: AtomicU64,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Creates a world with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: EngineConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let capacity = config.initial_entity_capacity;
        Self {
            allocator: EntityAllocator::new(),
            entities: RwLock::new(HashSet::with_capacity(capacity)),
            sets: RwLock::new(HashMap::with_capacity(capacity)),
            arrays: RwLock::new(HashMap::new()),
            systems: Mutex::new(Vec::new()),
            incoming: Mutex::new(Vec::new()),
            ticking: Mutex::new(None),
            entity_count: AtomicUsize::new(0),
            component_count: AtomicUsize::new(0),
            system_count: AtomicUsize::new(0),
            ticks: AtomicU64::new(0),
            config,
        }
    }

    /// Returns the configuration this world was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Allocates a new entity with an empty component set.
    pub fn create_entity(&self) -> EntityId {
        let id = self.allocator.allocate();
        let set = ComponentSet::with_kind_limit(usize::from(self.config.max_component_kinds));

        let mut entities = self.entities.write();
        let mut sets = self.sets.write();
        entities.insert(id);
        sets.insert(id, set);
        drop(sets);
        drop(entities);

        self.entity_count.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(entity = %id, "entity created");
        id
    }

    /// Destroys an entity and every component it owns.
    ///
    /// Unknown or already destroyed ids are a no-op.
    ///
    /// # Returns
    ///
    /// `true` if the entity was alive.
    pub fn destroy_entity(&self, id: EntityId) -> bool {
        let mut entities = self.entities.write();
        if !entities.remove(&id) {
            return false;
        }
        let mut sets = self.sets.write();
        let set = sets.remove(&id).unwrap_or_default();

        let arrays = self.arrays.read();
        let mut removed = 0;
        for kind in set.iter() {
            if let Some(cell) = arrays.get(&kind) {
                let mut array = cell.write();
                debug_assert_eq!(array.kind(), kind);
                if array.remove(id) {
                    removed += 1;
                }
            }
        }
        drop(arrays);
        drop(sets);
        drop(entities);

        self.component_count.fetch_sub(removed, Ordering::Relaxed);
        self.entity_count.fetch_sub(1, Ordering::Relaxed);
        tracing::trace!(entity = %id, components = removed, "entity destroyed");
        true
    }

    /// Checks if an entity is alive.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.read().contains(&id)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Inserts or overwrites a component and marks it in the entity's set.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownEntity`] if `id` is not alive
    /// - [`EcsError::InvalidComponentKind`] if `C::KIND` is out of range
    /// - [`EcsError::KindConflict`] if another type already owns `C::KIND`
    pub fn add_component<C: Component>(&self, id: EntityId, component: C) -> EcsResult<()> {
        self.check_kind(C::KIND)?;

        let entities = self.entities.read();
        if !entities.contains(&id) {
            return Err(EcsError::UnknownEntity(id));
        }
        let mut sets = self.sets.write();
        let set = sets.get_mut(&id).ok_or(EcsError::UnknownEntity(id))?;

        let cell = self.array_cell_or_create::<C>();
        let mut guard = cell.write();
        let array = downcast_mut::<C>(&mut **guard)?;
        if array.add(id, component) {
            self.component_count.fetch_add(1, Ordering::Relaxed);
        }
        set.add_component(C::KIND);
        Ok(())
    }

    /// Returns a copy of the entity's component.
    ///
    /// `Ok(None)` means the entity is alive but lacks the kind.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownEntity`] if `id` is not alive
    /// - [`EcsError::InvalidComponentKind`] if `C::KIND` is out of range
    /// - [`EcsError::KindConflict`] if another type already owns `C::KIND`
    pub fn get_component<C: Component>(&self, id: EntityId) -> EcsResult<Option<C>> {
        self.check_kind(C::KIND)?;

        let entities = self.entities.read();
        if !entities.contains(&id) {
            return Err(EcsError::UnknownEntity(id));
        }
        let Some(cell) = self.array_cell(C::KIND) else {
            return Ok(None);
        };
        let guard = cell.read();
        let array = downcast_ref::<C>(&**guard)?;
        Ok(array.get(id).cloned())
    }

    /// Mutates the entity's component in place under the array's lock.
    ///
    /// `f` must not call back into the world.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the entity lacks the kind, otherwise `f`'s result.
    ///
    /// # Errors
    ///
    /// Same as [`World::get_component`].
    pub fn modify_component<C, R, F>(&self, id: EntityId, f: F) -> EcsResult<Option<R>>
    where
        C: Component,
        F: FnOnce(&mut C) -> R,
    {
        self.check_kind(C::KIND)?;

        let entities = self.entities.read();
        if !entities.contains(&id) {
            return Err(EcsError::UnknownEntity(id));
        }
        let Some(cell) = self.array_cell(C::KIND) else {
            return Ok(None);
        };
        let mut guard = cell.write();
        let array = downcast_mut::<C>(&mut **guard)?;
        Ok(array.get_mut(id).map(f))
    }

    /// Removes the entity's component of type `C`.
    ///
    /// # Errors
    ///
    /// Same as [`World::remove_component_kind`].
    pub fn remove_component<C: Component>(&self, id: EntityId) -> EcsResult<bool> {
        self.remove_component_kind(id, C::KIND)
    }

    /// Removes the entity's component of `kind` and clears its bit.
    ///
    /// Absent components are a no-op.
    ///
    /// # Returns
    ///
    /// `true` if a value was removed.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownEntity`] if `id` is not alive
    /// - [`EcsError::InvalidComponentKind`] if `kind` is out of range
    pub fn remove_component_kind(&self, id: EntityId, kind: ComponentKind) -> EcsResult<bool> {
        self.check_kind(kind)?;

        let entities = self.entities.read();
        if !entities.contains(&id) {
            return Err(EcsError::UnknownEntity(id));
        }
        let mut sets = self.sets.write();
        let set = sets.get_mut(&id).ok_or(EcsError::UnknownEntity(id))?;
        if !set.has_component(kind) {
            return Ok(false);
        }

        let removed = self
            .array_cell(kind)
            .is_some_and(|cell| cell.write().remove(id));
        set.remove_component(kind);
        if removed {
            self.component_count.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    /// Whether the entity owns `kind`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownEntity`] if `id` is not alive
    /// - [`EcsError::InvalidComponentKind`] if `kind` is out of range
    pub fn has_component(&self, id: EntityId, kind: ComponentKind) -> EcsResult<bool> {
        self.check_kind(kind)?;

        let entities = self.entities.read();
        if !entities.contains(&id) {
            return Err(EcsError::UnknownEntity(id));
        }
        let sets = self.sets.read();
        Ok(sets.get(&id).is_some_and(|set| set.has_component(kind)))
    }

    /// Entities owning every kind in `required`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidComponentKind`] for an out-of-range kind.
    pub fn query(&self, required: &[ComponentKind]) -> EcsResult<Vec<EntityId>> {
        for &kind in required {
            self.check_kind(kind)?;
        }
        Ok(self.matching(&ComponentSet::from_kinds(required)))
    }

    /// Number of values stored for `kind`.
    #[must_use]
    pub fn storage_len(&self, kind: ComponentKind) -> usize {
        self.array_cell(kind).map_or(0, |cell| cell.read().len())
    }

    /// Whether the array for `kind` holds a value for `id`.
    #[must_use]
    pub fn storage_contains(&self, kind: ComponentKind, id: EntityId) -> bool {
        self.array_cell(kind)
            .is_some_and(|cell| cell.read().contains(id))
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Appends a system. Systems run in registration order.
    ///
    /// The required-kind list is copied now; later changes to what the
    /// system would report are ignored. A system added from inside a tick
    /// first runs on the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidComponentKind`] if a required kind is out
    /// of range.
    pub fn add_system<S: System + 'static>(&self, system: S) -> EcsResult<()> {
        let required: Box<[ComponentKind]> = system.required_components().into();
        for &kind in required.iter() {
            self.check_kind(kind)?;
        }
        let mask = ComponentSet::from_kinds(&required);

        tracing::debug!(system = system.name(), required = ?required, "system registered");
        self.incoming.lock().push(RegisteredSystem {
            system: Box::new(system),
            required,
            mask,
        });
        self.system_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Runs one tick.
    ///
    /// Systems run sequentially in registration order, each receiving the
    /// entities matching its requirements at the moment it starts, so later
    /// systems observe the effects of earlier ones. No world lock is held
    /// while a system runs.
    ///
    /// Called from inside a system's update, this logs a warning and
    /// returns without running anything. Calls from other threads wait for
    /// the running tick.
    pub fn update(&self, delta_time: f32) {
        if self.is_tick_thread() {
            tracing::warn!("update called from inside a tick, ignored");
            return;
        }
        let mut systems = self.systems.lock();
        let tick = TickGuard::enter(&self.ticking);
        systems.append(&mut self.incoming.lock());

        for registered in systems.iter_mut() {
            let entities = self.matching(&registered.mask);
            registered.system.update(self, delta_time, &entities);
            tracing::debug!(
                system = registered.system.name(),
                required = registered.required.len(),
                matched = entities.len(),
                "system updated"
            );
        }
        drop(tick);
        drop(systems);

        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Calls [`System::shutdown`] on every system, in registration order.
    ///
    /// Called from inside a system's update, this logs a warning and
    /// returns `false` without shutting anything down. Calls from other
    /// threads wait for the running tick.
    ///
    /// # Returns
    ///
    /// `true` if the systems were shut down.
    pub fn shutdown_systems(&self) -> bool {
        if self.is_tick_thread() {
            tracing::warn!("shutdown_systems called from inside a tick, ignored");
            return false;
        }
        let mut systems = self.systems.lock();
        systems.append(&mut self.incoming.lock());
        for registered in systems.iter_mut() {
            registered.system.shutdown();
        }
        tracing::debug!(systems = systems.len(), "systems shut down");
        true
    }

    fn is_tick_thread(&self) -> bool {
        *self.ticking.lock() == Some(thread::current().id())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entity_count.load(Ordering::Relaxed)
    }

    /// Stored component values across all kinds.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.component_count.load(Ordering::Relaxed)
    }

    /// Registered systems, including ones not yet picked up by a tick.
    #[inline]
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.system_count.load(Ordering::Relaxed)
    }

    /// Completed ticks.
    #[inline]
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Returns an introspection snapshot.
    ///
    /// `estimated_memory_bytes` is an approximation: stored values, the
    /// forward and reverse slot indexes, component-set words and the
    /// entity registry keys.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        let entity_bytes = self.entities.read().len() * size_of::<EntityId>();
        let set_bytes: usize = self
            .sets
            .read()
            .values()
            .map(|set| {
                size_of::<EntityId>() + size_of::<ComponentSet>() + set.word_count() * size_of::<u64>()
            })
            .sum();
        let array_bytes: usize = self
            .arrays
            .read()
            .values()
            .map(|cell| cell.read().estimated_bytes())
            .sum();

        WorldStats {
            entity_count: self.entity_count(),
            component_count: self.component_count(),
            system_count: self.system_count(),
            estimated_memory_bytes: entity_bytes + set_bytes + array_bytes,
            ticks: self.ticks(),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check_kind(&self, kind: ComponentKind) -> EcsResult<()> {
        let limit = self.config.max_component_kinds;
        if kind.raw() >= limit {
            return Err(EcsError::InvalidComponentKind { kind, limit });
        }
        Ok(())
    }

    /// Sorted ids whose set contains every bit of `mask`.
    fn matching(&self, mask: &ComponentSet) -> Vec<EntityId> {
        let sets = self.sets.read();
        let mut matched: Vec<EntityId> = sets
            .iter()
            .filter(|(_, set)| set.contains_all(mask))
            .map(|(&id, _)| id)
            .collect();
        drop(sets);
        matched.sort_unstable();
        matched
    }

    fn array_cell(&self, kind: ComponentKind) -> Option<ArrayCell> {
        self.arrays.read().get(&kind).map(Arc::clone)
    }

    fn array_cell_or_create<C: Component>(&self) -> ArrayCell {
        if let Some(cell) = self.array_cell(C::KIND) {
            return cell;
        }
        let mut arrays = self.arrays.write();
        let cell = arrays.entry(C::KIND).or_insert_with(|| {
            tracing::debug!(
                kind = %C::KIND,
                component = std::any::type_name::<C>(),
                "component array created"
            );
            let array: Box<dyn ErasedArray> = Box::new(ComponentArray::<C>::new());
            Arc::new(RwLock::new(array))
        });
        Arc::clone(cell)
    }
}

/// Marks the current thread as running systems until dropped.
struct TickGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> TickGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *slot.lock() = Some(thread::current().id());
        Self(slot)
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

fn conflict<C: Component>(existing: &dyn ErasedArray) -> EcsError {
    tracing::warn!(
        kind = %C::KIND,
        existing = existing.type_name(),
        rejected = std::any::type_name::<C>(),
        "component kind bound to two types"
    );
    EcsError::KindConflict {
        kind: C::KIND,
        type_name: std::any::type_name::<C>(),
    }
}

fn downcast_ref<C: Component>(array: &dyn ErasedArray) -> EcsResult<&ComponentArray<C>> {
    match array.as_any().downcast_ref::<ComponentArray<C>>() {
        Some(typed) => Ok(typed),
        None => Err(conflict::<C>(array)),
    }
}

fn downcast_mut<C: Component>(array: &mut dyn ErasedArray) -> EcsResult<&mut ComponentArray<C>> {
    if !array.as_any().is::<ComponentArray<C>>() {
        return Err(conflict::<C>(array));
    }
    array
        .as_any_mut()
        .downcast_mut::<ComponentArray<C>>()
        .ok_or(EcsError::KindConflict {
            kind: C::KIND,
            type_name: std::any::type_name::<C>(),
        })
}
