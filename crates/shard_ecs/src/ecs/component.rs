//! # Component System
//!
//! Components are pure data containers with no behavior. Each Rust type
//! declares the [`ComponentKind`] it occupies at compile time; the kind is
//! the bit index in every entity's [`ComponentSet`](super::ComponentSet)
//! and the key of its dense [`ComponentArray`](super::ComponentArray).

use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Identifier for a component type.
///
/// Small integers keep the per-entity bitmask short. Kinds `0..16` are
/// reserved for the engine's built-in components; collaborator services
/// should start at [`ComponentKind::FIRST_USER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentKind(u16);

impl ComponentKind {
    /// First kind not reserved by the engine.
    pub const FIRST_USER: Self = Self(16);

    /// Creates a kind from its index.
    #[inline]
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the bit index of this kind.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Clone`: lookups hand out a copy, never a long-lived reference
/// - `Send + Sync`: arrays are shared behind locks across threads
///
/// # Example
///
/// ```rust
/// use shard_ecs::{Component, ComponentKind};
///
/// #[derive(Clone, Debug)]
/// struct Faction {
///     id: u32,
/// }
///
/// impl Component for Faction {
///     const KIND: ComponentKind = ComponentKind::new(20);
/// }
/// ```
pub trait Component: Clone + Send + Sync + 'static {
    /// Kind occupied by this component type.
    const KIND: ComponentKind;
}

/// Position component for entities.
///
/// Represents a 3D position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// X coordinate in world space.
    pub x: f32,
    /// Y coordinate in world space.
    pub y: f32,
    /// Z coordinate in world space.
    pub z: f32,
    /// Padding for alignment (ensures 16-byte alignment for SIMD).
    pub _padding: f32,
}

impl Component for Position {
    const KIND: ComponentKind = ComponentKind(0);
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }

    /// Returns the squared distance to another position.
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Whether every coordinate is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Velocity component for entities.
///
/// Represents movement speed in world units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    /// X velocity component.
    pub x: f32,
    /// Y velocity component.
    pub y: f32,
    /// Z velocity component.
    pub z: f32,
    /// Padding for alignment.
    pub _padding: f32,
}

impl Component for Velocity {
    const KIND: ComponentKind = ComponentKind(1);
}

impl Velocity {
    /// Creates a new velocity.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }

    /// Speed in world units per second.
    #[inline]
    #[must_use]
    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Whether every axis is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Hit points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Health {
    /// Current hit points.
    pub current: f32,
    /// Upper bound for `current`.
    pub max: f32,
}

impl Component for Health {
    const KIND: ComponentKind = ComponentKind(2);
}

impl Health {
    /// Creates full health.
    #[inline]
    #[must_use]
    pub const fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Whether the entity has no hit points left.
    #[inline]
    #[must_use]
    pub fn is_depleted(self) -> bool {
        self.current <= 0.0
    }
}

/// Locomotion limits for entities that also carry a [`Velocity`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Movement {
    /// Velocity magnitude is clamped to this after integration.
    pub max_speed: f32,
    /// Stationary entities are not integrated.
    pub is_moving: bool,
}

impl Component for Movement {
    const KIND: ComponentKind = ComponentKind(3);
}

/// Combat bookkeeping. Combat rules themselves live in the combat service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Combat {
    /// Damage per attack.
    pub attack_power: f32,
    /// Reach in world units.
    pub attack_range: f32,
    /// Seconds between attacks.
    pub attack_interval: f32,
    /// Seconds until the next attack is allowed.
    pub cooldown_remaining: f32,
}

impl Component for Combat {
    const KIND: ComponentKind = ComponentKind(4);
}

impl Combat {
    /// Whether the cooldown has elapsed.
    #[inline]
    #[must_use]
    pub fn is_ready(self) -> bool {
        self.cooldown_remaining <= 0.0
    }
}
