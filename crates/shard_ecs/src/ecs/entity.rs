//! # Entity Identity
//!
//! Entities are opaque 64-bit handles. Values are handed out by a
//! monotonic counter and never reused within a process, so a stale handle
//! resolves to "not found" instead of aliasing a newer entity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID. Never produced by an allocator.
    pub const NULL: Self = Self(0);

    /// Wraps a raw value, e.g. one received from a collaborator service.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw 64-bit value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Lock-free monotonic ID source.
#[derive(Debug)]
pub(crate) struct EntityAllocator {
    next: AtomicU64,
}

impl EntityAllocator {
    pub(crate) const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Hands out the next identifier.
    #[inline]
    pub(crate) fn allocate(&self) -> EntityId {
        EntityId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
