//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default number of idle contexts kept for reuse.
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Settings fixed when an [`App`](crate::App) is built.
///
/// Deserializable so it can be embedded in a larger configuration file;
/// missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Include fault details in 500 responses.
    pub debug: bool,
    /// Upper bound on idle contexts retained by the pool.
    pub pool_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Sets debug mode.
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the pool capacity.
    #[must_use]
    pub const fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"debug": true}"#).unwrap();
        assert!(config.debug);
        assert_eq!(config.pool_capacity, DEFAULT_POOL_CAPACITY);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default().debug(true).pool_capacity(4);
        assert_eq!(
            config,
            EngineConfig {
                debug: true,
                pool_capacity: 4
            }
        );
    }
}
