//! Error types for the exporter-metrics crate.

use thiserror::Error;

/// Errors that can occur while configuring or registering metrics.
///
/// Update paths (`increment_counter`, `set_gauge`) never return errors:
/// unknown keys and directory misses are absorbed there.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The metric name is invalid (empty or contains invalid characters).
    #[error("invalid metric name: {reason}")]
    InvalidMetricName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// A metric with the given key is already registered.
    #[error("metric already registered: {key}")]
    DuplicateMetric {
        /// The key that was registered twice.
        key: String,
    },

    /// Another metric is already exposed under the given name.
    #[error("metric name already in use: {name}")]
    DuplicateName {
        /// The exposed name that was registered twice.
        name: String,
    },

    /// The exporter configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration was rejected.
        reason: String,
    },
}

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
