//! Combat placeholder.
//!
//! Demonstrates the required-component pattern only: it ticks attack
//! cooldowns down and reports which living entities may attack. Damage,
//! targeting and every other rule belong to the combat service.

use crate::ecs::{Combat, Component, ComponentKind, EntityId, Health, Position, World};

use super::System;

const REQUIRED: [ComponentKind; 3] = [Position::KIND, Health::KIND, Combat::KIND];

/// Ticks combat cooldowns for living entities.
#[derive(Debug, Default)]
pub struct CombatSystem {
    ready: Vec<EntityId>,
}

impl CombatSystem {
    /// Creates the system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Living entities whose cooldown had elapsed at the end of the last tick.
    #[must_use]
    pub fn ready(&self) -> &[EntityId] {
        &self.ready
    }
}

impl System for CombatSystem {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn required_components(&self) -> &[ComponentKind] {
        &REQUIRED
    }

    fn update(&mut self, world: &World, delta_time: f32, entities: &[EntityId]) {
        self.ready.clear();
        for &id in entities {
            let alive = match world.get_component::<Health>(id) {
                Ok(Some(health)) => !health.is_depleted(),
                Ok(None) | Err(_) => continue,
            };
            if !alive {
                continue;
            }

            let ticked = world.modify_component::<Combat, _, _>(id, |combat| {
                if !combat.cooldown_remaining.is_finite() || !delta_time.is_finite() {
                    return None;
                }
                combat.cooldown_remaining = (combat.cooldown_remaining - delta_time).max(0.0);
                Some(combat.is_ready())
            });
            match ticked {
                Ok(Some(Some(true))) => self.ready.push(id),
                Ok(Some(None)) => {
                    tracing::warn!(entity = %id, "skipping entity with invalid combat cooldown");
                }
                Ok(Some(Some(false)) | None) => {}
                Err(err) => tracing::trace!(entity = %id, %err, "entity vanished mid-update"),
            }
        }
    }
}
