//! # Engine Configuration
//!
//! Tunables loaded once at startup from a TOML file. Every key is
//! optional; missing keys fall back to [`EngineConfig::default`].
//!
//! ```toml
//! max_component_kinds = 128
//! initial_entity_capacity = 20000
//! worker_threads = 4
//! worker_queue_capacity = 512
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Hard ceiling for `max_component_kinds`.
pub const COMPONENT_KIND_CEILING: u16 = 4096;

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Exclusive upper bound on component kind values.
    pub max_component_kinds: u16,
    /// Pre-sizing hint for the entity and component-set registries.
    pub initial_entity_capacity: usize,
    /// Default worker count for pooled systems.
    pub worker_threads: usize,
    /// Length of the bounded worker job queue.
    pub worker_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_component_kinds: 256,
            initial_entity_capacity: 1024,
            worker_threads: std::thread::available_parallelism().map_or(1, usize::from),
            worker_queue_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML, unknown keys,
    /// or out-of-range values.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or
    /// its contents are invalid.
    pub fn from_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EcsError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] naming the first bad key.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_component_kinds == 0 || self.max_component_kinds > COMPONENT_KIND_CEILING {
            return Err(EcsError::InvalidConfig(format!(
                "max_component_kinds must be in 1..={COMPONENT_KIND_CEILING}, got {}",
                self.max_component_kinds
            )));
        }
        if self.worker_threads == 0 {
            return Err(EcsError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.worker_queue_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "worker_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
