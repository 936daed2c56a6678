//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, DispatchResult};

/// Default number of events buffered per collector before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Configuration for the [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Events buffered for each collector. A collector that falls further
    /// behind loses the oldest events.
    pub channel_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl DispatcherConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-collector channel capacity.
    #[must_use]
    pub const fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidConfig` if the capacity is zero.
    pub fn validate(&self) -> DispatchResult<()> {
        if self.channel_capacity == 0 {
            return Err(DispatchError::InvalidConfig(
                "channel capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
