//! # Component Storage
//!
//! Dense, swap-removal storage for a single component type.
//!
//! The storage keeps three parallel views:
//! - `values`: every live component, contiguous, slots `[0, len)`
//! - `entities`: slot -> owning entity (reverse index)
//! - `slots`: entity -> slot (forward index)
//!
//! Removal moves the last value into the vacated slot, so add, get and
//! remove are all O(1). Iteration order is NOT stable across removals.

use std::any::Any;
use std::collections::HashMap;
use std::mem::size_of;

use bytemuck::Pod;

use super::component::{Component, ComponentKind};
use super::entity::EntityId;

/// Dense storage for a single component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
///
/// # Example
///
/// ```rust
/// use shard_ecs::{ComponentArray, EntityId, Position};
///
/// let mut array: ComponentArray<Position> = ComponentArray::new();
/// array.add(EntityId::from_raw(1), Position::new(1.0, 2.0, 3.0));
/// assert_eq!(array.size(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct ComponentArray<C: Component> {
    /// The dense array of components.
    values: Vec<C>,
    /// Owner of each slot.
    entities: Vec<EntityId>,
    /// Slot of each owner.
    slots: HashMap<EntityId, usize>,
}

impl<C: Component> Default for ComponentArray<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Component> ComponentArray<C> {
    /// Creates an empty array.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            entities: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Creates an empty array with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts or overwrites the value for `id`.
    ///
    /// # Returns
    ///
    /// `true` if a new slot was appended, `false` if an existing value
    /// was overwritten in place.
    #[inline]
    pub fn add(&mut self, id: EntityId, component: C) -> bool {
        if let Some(&slot) = self.slots.get(&id) {
            self.values[slot] = component;
            return false;
        }
        self.slots.insert(id, self.values.len());
        self.values.push(component);
        self.entities.push(id);
        true
    }

    /// Gets the value for `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&C> {
        self.slots.get(&id).map(|&slot| &self.values[slot])
    }

    /// Gets the value for `id` mutably.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut C> {
        self.slots.get(&id).map(|&slot| &mut self.values[slot])
    }

    /// Removes and returns the value for `id`.
    ///
    /// The last value is moved into the vacated slot and its owner's slot
    /// record is updated.
    pub fn take(&mut self, id: EntityId) -> Option<C> {
        let slot = self.slots.remove(&id)?;
        let removed = self.values.swap_remove(slot);
        self.entities.swap_remove(slot);
        if let Some(&moved) = self.entities.get(slot) {
            self.slots.insert(moved, slot);
        }
        Some(removed)
    }

    /// Removes the value for `id`.
    ///
    /// # Returns
    ///
    /// `false` if `id` had no slot.
    #[inline]
    pub fn remove(&mut self, id: EntityId) -> bool {
        self.take(id).is_some()
    }

    /// Whether `id` has a slot.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of stored values.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Whether no values are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Slot of `id`, if present.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// Returns a slice of all values in slot order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.values
    }

    /// Returns the owners of all slots, parallel to [`Self::as_slice`].
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Iterates over `(owner, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    /// Iterates mutably over `(owner, value)` pairs in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut C)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }

    /// Drops every value, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.values.clear();
        self.entities.clear();
        self.slots.clear();
    }

    /// Approximate heap footprint.
    ///
    /// Counts the value and reverse-index vectors plus one key/value pair
    /// per forward-index entry. Hash table control bytes are ignored.
    #[must_use]
    pub fn estimated_bytes(&self) -> usize {
        let len = self.values.len();
        len * (size_of::<C>() + size_of::<EntityId>())
            + self.slots.len() * (size_of::<EntityId>() + size_of::<usize>())
    }
}

impl<C: Component + Pod> ComponentArray<C> {
    /// Raw byte view of the dense values, for snapshot or GPU upload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.values)
    }
}

/// Type-erased view of a [`ComponentArray`], used where the world only
/// knows the [`ComponentKind`] (entity destruction, statistics).
pub(crate) trait ErasedArray: Send + Sync {
    /// Kind stored in this array.
    fn kind(&self) -> ComponentKind;
    /// `std::any::type_name` of the stored type.
    fn type_name(&self) -> &'static str;
    /// Whether `id` has a slot.
    fn contains(&self, id: EntityId) -> bool;
    /// Swap-removes `id`; `false` if absent.
    fn remove(&mut self, id: EntityId) -> bool;
    /// Number of stored values.
    fn len(&self) -> usize;
    /// Approximate heap footprint.
    fn estimated_bytes(&self) -> usize;
    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
    /// Downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedArray for ComponentArray<C> {
    fn kind(&self) -> ComponentKind {
        C::KIND
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn contains(&self, id: EntityId) -> bool {
        ComponentArray::contains(self, id)
    }

    fn remove(&mut self, id: EntityId) -> bool {
        ComponentArray::remove(self, id)
    }

    fn len(&self) -> usize {
        self.size()
    }

    fn estimated_bytes(&self) -> usize {
        ComponentArray::estimated_bytes(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Health, Position};

    fn e(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    /// Every slot's owner maps back to that slot.
    fn assert_dense<C: Component>(array: &ComponentArray<C>) {
        assert_eq!(array.values.len(), array.entities.len());
        assert_eq!(array.values.len(), array.slots.len());
        for (slot, id) in array.entities.iter().enumerate() {
            assert_eq!(array.slots.get(id), Some(&slot));
        }
    }

    #[test]
    fn test_add_get_overwrite() {
        let mut array: ComponentArray<Position> = ComponentArray::new();
        assert!(array.add(e(1), Position::new(1.0, 2.0, 3.0)));
        assert!(!array.add(e(1), Position::new(4.0, 5.0, 6.0)));
        assert_eq!(array.size(), 1);
        assert_eq!(array.get(e(1)), Some(&Position::new(4.0, 5.0, 6.0)));
        assert!(array.get(e(2)).is_none());
        assert_dense(&array);
    }

    #[test]
    fn test_swap_removal_keeps_others() {
        let mut array: ComponentArray<Health> = ComponentArray::new();
        for (raw, hp) in (1..=5).zip([1.0f32, 2.0, 3.0, 4.0, 5.0]) {
            array.add(e(raw), Health::full(hp));
        }

        assert!(array.remove(e(3)));
        assert_eq!(array.size(), 4);
        assert!(array.get(e(3)).is_none());
        for (raw, hp) in [(1, 1.0f32), (2, 2.0), (4, 4.0), (5, 5.0)] {
            assert_eq!(array.get(e(raw)), Some(&Health::full(hp)));
        }
        // Last element moved into the hole.
        assert_eq!(array.slot_of(e(5)), Some(2));
        assert_dense(&array);
    }

    #[test]
    fn test_remove_last_and_absent() {
        let mut array: ComponentArray<Health> = ComponentArray::new();
        array.add(e(1), Health::full(1.0));
        array.add(e(2), Health::full(2.0));

        assert!(array.remove(e(2)));
        assert!(!array.remove(e(2)));
        assert!(!array.remove(e(9)));
        assert_eq!(array.size(), 1);
        assert_dense(&array);

        assert!(array.remove(e(1)));
        assert!(array.is_empty());
        assert_dense(&array);
    }

    #[test]
    fn test_take_returns_value() {
        let mut array: ComponentArray<Health> = ComponentArray::new();
        array.add(e(7), Health::full(10.0));
        assert_eq!(array.take(e(7)), Some(Health::full(10.0)));
        assert_eq!(array.take(e(7)), None);
    }

    #[test]
    fn test_iter_pairs_owner_with_value() {
        let mut array: ComponentArray<Health> = ComponentArray::new();
        array.add(e(1), Health::full(1.0));
        array.add(e(2), Health::full(2.0));
        array.remove(e(1));
        let pairs: Vec<_> = array.iter().map(|(id, h)| (id, h.max)).collect();
        assert_eq!(pairs, vec![(e(2), 2.0)]);
    }

    #[test]
    fn test_as_bytes_covers_dense_values() {
        let mut array: ComponentArray<Position> = ComponentArray::new();
        array.add(e(1), Position::new(1.0, 0.0, 0.0));
        array.add(e(2), Position::new(2.0, 0.0, 0.0));
        let bytes = array.as_bytes();
        assert_eq!(bytes.len(), 2 * std::mem::size_of::<Position>());
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
    }

    #[test]
    fn test_erased_view() {
        let mut array: ComponentArray<Position> = ComponentArray::new();
        array.add(e(1), Position::default());
        let erased: &mut dyn ErasedArray = &mut array;
        assert_eq!(erased.kind(), Position::KIND);
        assert!(erased.contains(e(1)));
        assert!(erased.estimated_bytes() > 0);
        assert!(erased.remove(e(1)));
        assert_eq!(erased.len(), 0);
        assert!(erased
            .as_any()
            .downcast_ref::<ComponentArray<Position>>()
            .is_some());
    }
}
