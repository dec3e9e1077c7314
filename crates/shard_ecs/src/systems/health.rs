//! Health clamping: keeps `current` within `[0, max]`.

use crate::ecs::{Component, ComponentKind, EntityId, Health, World};

use super::System;

const REQUIRED: [ComponentKind; 1] = [Health::KIND];

/// Outcome of clamping one value.
enum Clamp {
    Unchanged,
    Clamped,
    Invalid,
}

fn clamp(health: &mut Health) -> Clamp {
    if !health.max.is_finite() || health.max < 0.0 || health.current.is_nan() {
        return Clamp::Invalid;
    }
    let clamped = health.current.clamp(0.0, health.max);
    if clamped.to_bits() == health.current.to_bits() {
        return Clamp::Unchanged;
    }
    health.current = clamped;
    Clamp::Clamped
}

/// Keeps every entity's health within its bounds.
#[derive(Debug, Default)]
pub struct HealthSystem {
    clamped: usize,
}

impl HealthSystem {
    /// Creates the system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Values corrected during the last tick.
    #[must_use]
    pub fn clamped_last_tick(&self) -> usize {
        self.clamped
    }
}

impl System for HealthSystem {
    fn name(&self) -> &'static str {
        "health"
    }

    fn required_components(&self) -> &[ComponentKind] {
        &REQUIRED
    }

    fn update(&mut self, world: &World, _delta_time: f32, entities: &[EntityId]) {
        self.clamped = 0;
        for &id in entities {
            match world.modify_component::<Health, _, _>(id, clamp) {
                Ok(Some(Clamp::Clamped)) => self.clamped += 1,
                Ok(Some(Clamp::Invalid)) => {
                    tracing::warn!(entity = %id, "skipping entity with invalid health bounds");
                }
                Ok(Some(Clamp::Unchanged)) | Ok(None) => {}
                Err(err) => tracing::trace!(entity = %id, %err, "entity vanished mid-update"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_both_ends() {
        let world = World::new();
        let over = world.create_entity();
        let under = world.create_entity();
        let fine = world.create_entity();
        world.add_component(over, Health { current: 150.0, max: 100.0 }).unwrap();
        world.add_component(under, Health { current: -5.0, max: 100.0 }).unwrap();
        world.add_component(fine, Health { current: 40.0, max: 100.0 }).unwrap();

        let mut system = HealthSystem::new();
        system.update(&world, 0.016, &[over, under, fine]);

        assert_eq!(system.clamped_last_tick(), 2);
        assert_eq!(world.get_component::<Health>(over).unwrap(), Some(Health::full(100.0)));
        assert_eq!(
            world.get_component::<Health>(under).unwrap(),
            Some(Health { current: 0.0, max: 100.0 })
        );
        assert_eq!(
            world.get_component::<Health>(fine).unwrap(),
            Some(Health { current: 40.0, max: 100.0 })
        );
    }

    #[test]
    fn test_invalid_bounds_are_left_alone() {
        let world = World::new();
        let inverted = world.create_entity();
        let good = world.create_entity();
        world.add_component(inverted, Health { current: 10.0, max: -1.0 }).unwrap();
        world.add_component(good, Health { current: 200.0, max: 100.0 }).unwrap();

        let mut system = HealthSystem::new();
        system.update(&world, 0.016, &[inverted, good]);

        assert_eq!(
            world.get_component::<Health>(inverted).unwrap(),
            Some(Health { current: 10.0, max: -1.0 })
        );
        assert_eq!(world.get_component::<Health>(good).unwrap(), Some(Health::full(100.0)));
    }
}
