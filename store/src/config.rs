//! Registry configuration
//!
//! Configuration is loaded from environment variables; absent or unparsable
//! values fall back to defaults.

use std::env;

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of stores one registry will hold
    pub max_stores: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_stores: 1024 }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("STATECAST_MAX_STORES")
            && let Ok(v) = val.parse()
        {
            config.max_stores = v;
        }

        config
    }
}
