//! # Synchronization Primitives
//!
//! Concurrency helpers for systems that fan work out across threads.
//! The world itself is never parallel across systems; parallelism lives
//! inside a single system's update.

mod worker_pool;

pub use worker_pool::WorkerPool;
