//! Movement integration: position += velocity * dt, then clamp speed.

use crate::ecs::{Component, ComponentKind, EntityId, Movement, Position, Velocity, World};
use crate::error::EcsResult;

use super::System;

const REQUIRED: [ComponentKind; 3] = [Position::KIND, Velocity::KIND, Movement::KIND];

/// Outcome of integrating one entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// New position and clamped velocity.
    Moved(Position, Velocity),
    /// `is_moving` was false; nothing changes.
    Stationary,
    /// Data cannot be integrated; the entity is skipped.
    Invalid(&'static str),
}

/// Integrates one entity over `delta_time` seconds.
///
/// The velocity magnitude is clamped to `movement.max_speed` AFTER the
/// position advances, so the clamp takes effect from the next tick.
#[must_use]
pub fn integrate(position: Position, velocity: Velocity, movement: Movement, delta_time: f32) -> Step {
    if !movement.is_moving {
        return Step::Stationary;
    }
    if !delta_time.is_finite() {
        return Step::Invalid("non-finite delta time");
    }
    if !position.is_finite() || !velocity.is_finite() {
        return Step::Invalid("non-finite position or velocity");
    }
    if !movement.max_speed.is_finite() || movement.max_speed < 0.0 {
        return Step::Invalid("max speed must be finite and non-negative");
    }

    let moved = Position::new(
        position.x + velocity.x * delta_time,
        position.y + velocity.y * delta_time,
        position.z + velocity.z * delta_time,
    );

    let speed = velocity.magnitude();
    let clamped = if speed > movement.max_speed && speed > 0.0 {
        let scale = movement.max_speed / speed;
        Velocity::new(velocity.x * scale, velocity.y * scale, velocity.z * scale)
    } else {
        velocity
    };

    Step::Moved(moved, clamped)
}

/// Writes an integration result back through the world.
pub(super) fn apply(world: &World, id: EntityId, position: Position, velocity: Velocity) -> EcsResult<()> {
    world.modify_component::<Position, _, _>(id, |slot| *slot = position)?;
    world.modify_component::<Velocity, _, _>(id, |slot| *slot = velocity)?;
    Ok(())
}

/// Snapshot of the three inputs, or `None` if any is gone.
pub(super) fn gather(world: &World, id: EntityId) -> Option<(Position, Velocity, Movement)> {
    let position = world.get_component::<Position>(id).ok().flatten()?;
    let velocity = world.get_component::<Velocity>(id).ok().flatten()?;
    let movement = world.get_component::<Movement>(id).ok().flatten()?;
    Some((position, velocity, movement))
}

/// Advances every moving entity on the tick thread.
#[derive(Debug, Default)]
pub struct MovementSystem {
    moved: usize,
    skipped: usize,
}

impl MovementSystem {
    /// Creates the system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn required_components(&self) -> &[ComponentKind] {
        &REQUIRED
    }

    fn update(&mut self, world: &World, delta_time: f32, entities: &[EntityId]) {
        self.moved = 0;
        self.skipped = 0;

        for &id in entities {
            let Some((position, velocity, movement)) = gather(world, id) else {
                tracing::trace!(entity = %id, "movement inputs gone, skipping");
                self.skipped += 1;
                continue;
            };
            match integrate(position, velocity, movement, delta_time) {
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
}
