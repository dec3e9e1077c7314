//! # Engine Error Types
//!
//! All errors that can occur in the ECS engine. Every one of them is an
//! expected, recoverable condition returned to the caller.

use thiserror::Error;

use crate::ecs::{ComponentKind, EntityId};

/// Errors that can occur in the ECS engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity was never allocated or has already been destroyed.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// A component kind outside the configured range was used.
    #[error("invalid component kind {kind}: limit is {limit}")]
    InvalidComponentKind {
        /// The offending kind.
        kind: ComponentKind,
        /// Exclusive upper bound on kinds for this world.
        limit: u16,
    },

    /// Two distinct component types declared the same kind.
    #[error("component kind {kind} is already bound to a different type, rejected {type_name}")]
    KindConflict {
        /// The contested kind.
        kind: ComponentKind,
        /// Name of the type whose access was rejected.
        type_name: &'static str,
    },

    /// A job was submitted to a worker pool after it was closed.
    #[error("worker pool is closed")]
    WorkerPoolClosed,

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine operations.
pub type EcsResult<T> = Result<T, EcsError>;
