//! Exporter configuration.
//!
//! Durations are (de)serialized as whole seconds under `*_secs` keys so a
//! configuration file reads `cleaner_timeout_secs = 300`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Default namespace prefix for every registered metric name.
pub const DEFAULT_PREFIX: &str = "mqtt_exporter";

/// Default interval between two cleaner sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Default capacity of the cleaner's update queue.
pub const DEFAULT_UPDATE_QUEUE_CAPACITY: usize = 10;

/// Configuration for the metric registry and its gauge cleaner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Namespace prefix joined to every metric name.
    pub prefix: String,
    /// Time after which a gauge series without updates is removed. Zero disables eviction.
    #[serde(rename = "cleaner_timeout_secs", with = "duration_secs")]
    pub cleaner_timeout: Duration,
    /// Interval between two cleaner sweeps.
    #[serde(rename = "sweep_interval_secs", with = "duration_secs")]
    pub sweep_interval: Duration,
    /// Capacity of the queue between gauge setters and the cleaner.
    pub update_queue_capacity: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            cleaner_timeout: Duration::ZERO,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            update_queue_capacity: DEFAULT_UPDATE_QUEUE_CAPACITY,
        }
    }
}

impl ExporterConfig {
    /// Create a configuration with the given prefix and defaults elsewhere.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Set the cleaner timeout. `Duration::ZERO` disables eviction.
    #[must_use]
    pub const fn with_cleaner_timeout(mut self, timeout: Duration) -> Self {
        self.cleaner_timeout = timeout;
        self
    }

    /// Set the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the update queue capacity.
    #[must_use]
    pub const fn with_update_queue_capacity(mut self, capacity: usize) -> Self {
        self.update_queue_capacity = capacity;
        self
    }

    /// Whether gauge eviction is turned on.
    #[must_use]
    pub const fn cleaner_enabled(&self) -> bool {
        !self.cleaner_timeout.is_zero()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidConfig` if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(MetricsError::InvalidConfig {
                reason: "sweep interval must be positive".to_string(),
            });
        }

        if self.update_queue_capacity == 0 {
            return Err(MetricsError::InvalidConfig {
                reason: "update queue capacity must be positive".to_string(),
            });
        }

        if !self
            .prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        {
            return Err(MetricsError::InvalidConfig {
                reason: format!(
                    "prefix '{}' must contain only alphanumeric characters, underscores, and colons",
                    self.prefix
                ),
            });
        }

        if self.prefix.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(MetricsError::InvalidConfig {
                reason: format!("prefix '{}' must not start with a digit", self.prefix),
            });
        }

        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
