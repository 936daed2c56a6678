//! Core types shared by the label pipeline, the registry and the cleaner.
//!
//! - [`LabelMap`]: label name to value mapping used for every update
//! - [`MetricName`]: a validated Prometheus metric name
//! - [`MetricKind`] and [`MetricDescriptor`]: registration metadata

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Label name to label value mapping.
pub type LabelMap = HashMap<String, String>;

/// A validated metric name.
///
/// Metric names must:
/// - Be non-empty
/// - Contain only alphanumeric characters, underscores, and colons
/// - Start with a letter or underscore
/// - Be at most 256 characters long
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricName(String);

impl MetricName {
    /// Maximum allowed length for a metric name.
    pub const MAX_LENGTH: usize = 256;

    /// Creates a new validated metric name.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidMetricName` if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(MetricsError::InvalidMetricName {
                reason: "metric name cannot be empty".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(MetricsError::InvalidMetricName {
                reason: format!(
                    "metric name exceeds maximum length of {} characters",
                    Self::MAX_LENGTH
                ),
            });
        }

        if let Some(c) = name.chars().next() {
            if !c.is_ascii_alphabetic() && c != '_' {
                return Err(MetricsError::InvalidMetricName {
                    reason: format!("metric name '{name}' must start with a letter or underscore"),
                });
            }
        }

        if let Some(c) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != ':')
        {
            return Err(MetricsError::InvalidMetricName {
                reason: format!("invalid character '{c}' in metric name '{name}'"),
            });
        }

        Ok(Self(name))
    }

    /// Builds the namespaced name `prefix_name` and validates the result.
    ///
    /// See [`prefixed_name`] for the joining rules.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidMetricName` if the joined name is invalid.
    pub fn prefixed(prefix: &str, name: &str) -> Result<Self> {
        Self::new(prefixed_name(prefix, name))
    }

    /// Returns the metric name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `MetricName` and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Joins a namespace prefix and a metric name with exactly one underscore.
///
/// Both parts are trimmed of leading and trailing underscores first, so
/// `("mqtt_exporter_", "_uptime")` becomes `mqtt_exporter_uptime`. An empty
/// prefix yields the trimmed name alone.
#[must_use]
pub fn prefixed_name(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('_');
    let name = name.trim_matches('_');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

/// The storage kind of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic counter, one series per label combination.
    Counter,
    /// Settable gauge, one series per label combination, subject to TTL eviction.
    Gauge,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Gauge => write!(f, "gauge"),
        }
    }
}

/// Registration metadata of a metric. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    /// Lookup key used by update calls.
    pub key: String,
    /// Counter or gauge.
    pub kind: MetricKind,
    /// Exposed (prefixed) metric name.
    pub name: MetricName,
    /// Canonical label names, in the positional order used by the storage.
    pub label_names: Vec<String>,
}
