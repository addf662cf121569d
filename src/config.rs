// Trace configuration
//
// Loaded from a TOML file, overridden by environment, or taken as default.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`TraceConfig::initial_capacity`]
pub const CAPACITY_ENV_VAR: &str = "PHOSPHOR_TRACE_CAPACITY";

/// Configuration for newly constructed traces
///
/// # Example
/// ```
/// use phosphor::config::TraceConfig;
///
/// let config = TraceConfig::from_toml_str("initial_capacity = 64").unwrap();
/// assert_eq!(config.initial_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Frames reserved up front in each new trace
    ///
    /// Default: 16 (four RPC calls of up to four frames each)
    pub initial_capacity: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
        }
    }
}

impl TraceConfig {
    pub fn new(initial_capacity: usize) -> Self {
        Self { initial_capacity }
    }

    /// Parse a TOML document; missing keys take their default
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Default configuration with `PHOSPHOR_TRACE_CAPACITY` applied, if set
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of this configuration
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(value) = std::env::var(CAPACITY_ENV_VAR) {
            let parsed = value.trim().parse::<usize>();
            self.initial_capacity = parsed.map_err(|_| ConfigError::InvalidEnv {
                var: CAPACITY_ENV_VAR,
                value,
            })?;
        }
        Ok(self)
    }
}
