//! Reconciler configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};

/// Timing for the routing reconciler
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Delay between reconciliation checks
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Wait before applying the stored preference at startup
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Multiplier applied to the next delay after a failed check
    #[serde(default = "default_error_backoff_multiplier")]
    pub error_backoff_multiplier: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            error_backoff_multiplier: default_error_backoff_multiplier(),
        }
    }
}

impl RoutingConfig {
    /// Load from an optional TOML file, overridden by `SOUL_ROUTING_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                settings = settings.add_source(config::File::from(path));
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SOUL_ROUTING").try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_ms == 0 {
            return Err(RoutingError::Config(
                "check_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.error_backoff_multiplier == 0 {
            return Err(RoutingError::Config(
                "error_backoff_multiplier must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Delay used once after a failed check
    pub fn backoff_interval(&self) -> Duration {
        self.check_interval()
            .saturating_mul(self.error_backoff_multiplier)
    }
}

// Default values
fn default_check_interval_ms() -> u64 {
    2000
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_error_backoff_multiplier() -> u32 {
    2
}
