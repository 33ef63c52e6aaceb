//! Engine configuration

use reqcheck_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a settled verdict must stay undisturbed before it replaces a
    /// pending state, in milliseconds
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Per-channel capacity of the event buses
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl EngineConfig {
    /// Load configuration from a YAML file, or use defaults if it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        } else {
            tracing::debug!(path = %path.display(), "No engine config file, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bus_capacity == 0 {
            return Err(Error::config("bus_capacity must be at least 1"));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn with_settle_delay_ms(mut self, settle_delay_ms: u64) -> Self {
        self.settle_delay_ms = settle_delay_ms;
        self
    }

    pub fn with_bus_capacity(mut self, bus_capacity: usize) -> Self {
        self.bus_capacity = bus_capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

fn default_settle_delay() -> u64 {
    500
}

fn default_bus_capacity() -> usize {
    1024
}
