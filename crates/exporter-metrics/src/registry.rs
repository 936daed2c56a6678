//! The metric registry.
//!
//! [`MetricRegistry`] owns every registered counter and gauge, routes updates
//! through the label pipeline and reports gauge updates to its
//! [`GaugeCleaner`]. All series are exposed through one `prometheus-client`
//! registry, encoded on demand in the Prometheus text format.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use exporter_metrics::{ExporterConfig, LabelMap, MetricRegistry, StaticDirectory};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> exporter_metrics::Result<()> {
//! let registry = MetricRegistry::new(&ExporterConfig::default(), Arc::new(StaticDirectory::new()))?;
//! registry.try_register_gauge("rssiGauge", "tasmota_state_rssi", "WiFi signal strength", &["ssid"])?;
//!
//! let labels: LabelMap = [("ssid".to_string(), "home".to_string())].into_iter().collect();
//! registry.set_gauge("rssiGauge", "dev1", &labels, -52.0).await;
//!
//! let output = registry.encode();
//! assert!(output.contains("mqtt_exporter_tasmota_state_rssi"));
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use tracing::{debug, warn};

use crate::cleaner::{CleanerMetrics, CleanerSettings, GaugeCleaner, SeriesUpdate};
use crate::clock::{Clock, SystemClock};
use crate::config::ExporterConfig;
use crate::directory::DeviceDirectory;
use crate::error::{MetricsError, Result};
use crate::labels::{project_to_vector, register_label_names, resolve_label_values};
use crate::series::{CounterVector, GaugeVector};
use crate::types::{LabelMap, MetricDescriptor, MetricKind, MetricName};

#[derive(Debug)]
enum RegisteredMetric {
    Counter {
        descriptor: MetricDescriptor,
        vector: CounterVector,
    },
    Gauge {
        descriptor: MetricDescriptor,
        vector: GaugeVector,
    },
}

impl RegisteredMetric {
    const fn descriptor(&self) -> &MetricDescriptor {
        match self {
            Self::Counter { descriptor, .. } | Self::Gauge { descriptor, .. } => descriptor,
        }
    }
}

/// Registered metrics by key, plus every name exposed in the text format.
#[derive(Debug, Default)]
struct MetricTable {
    by_key: HashMap<String, RegisteredMetric>,
    exposed: HashSet<String>,
}

impl MetricTable {
    fn check_vacant(&self, descriptor: &MetricDescriptor) -> Result<()> {
        if self.by_key.contains_key(&descriptor.key) {
            return Err(MetricsError::DuplicateMetric {
                key: descriptor.key.clone(),
            });
        }
        if self.exposed.contains(descriptor.name.as_str()) {
            return Err(MetricsError::DuplicateName {
                name: descriptor.name.to_string(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, metric: RegisteredMetric) {
        let descriptor = metric.descriptor();
        let key = descriptor.key.clone();
        self.exposed.insert(descriptor.name.to_string());
        self.by_key.insert(key, metric);
    }
}

/// Registry of label-indexed counters and gauges.
///
/// Keys share one namespace across both kinds, and no two metrics (the
/// cleaner's own included) may expose the same name. Updates for unknown keys
/// are ignored so a missing registration never breaks ingestion.
pub struct MetricRegistry {
    prefix: String,
    directory: Arc<dyn DeviceDirectory>,
    registry: Arc<RwLock<Registry>>,
    metrics: RwLock<MetricTable>,
    cleaner: GaugeCleaner,
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("prefix", &self.prefix)
            .field("metrics", &self.metrics.read().by_key.len())
            .field("cleaner", &self.cleaner)
            .finish_non_exhaustive()
    }
}

impl MetricRegistry {
    /// Creates a registry reading time from the tokio clock.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidConfig` if the configuration is invalid.
    ///
    /// # Panics
    ///
    /// Panics if the cleaner timeout is non-zero and this is called outside a tokio runtime.
    pub fn new(config: &ExporterConfig, directory: Arc<dyn DeviceDirectory>) -> Result<Self> {
        Self::with_clock(config, directory, Arc::new(SystemClock))
    }

    /// Creates a registry whose cleaner reads time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidConfig` if the configuration is invalid.
    pub fn with_clock(
        config: &ExporterConfig,
        directory: Arc<dyn DeviceDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let mut registry = Registry::default();
        let cleaner_metrics = CleanerMetrics::register(&mut registry, &config.prefix);
        let cleaner = GaugeCleaner::start(
            CleanerSettings {
                timeout: config.cleaner_timeout,
                sweep_interval: config.sweep_interval,
                queue_capacity: config.update_queue_capacity,
            },
            clock,
            cleaner_metrics,
        );

        let metrics = MetricTable {
            by_key: HashMap::new(),
            exposed: CleanerMetrics::names(&config.prefix).into_iter().collect(),
        };

        Ok(Self {
            prefix: config.prefix.clone(),
            directory,
            registry: Arc::new(RwLock::new(registry)),
            metrics: RwLock::new(metrics),
            cleaner,
        })
    }

    /// The namespace prefix of every metric name.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The gauge cleaner attached to this registry.
    #[must_use]
    pub fn cleaner(&self) -> &GaugeCleaner {
        &self.cleaner
    }

    /// Number of registered metrics.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.metrics.read().by_key.len()
    }

    /// Returns the registration metadata for a key.
    #[must_use]
    pub fn descriptor(&self, key: &str) -> Option<MetricDescriptor> {
        self.metrics.read().by_key.get(key).map(|m| m.descriptor().clone())
    }

    fn prepare<S: AsRef<str>>(
        &self,
        key: &str,
        kind: MetricKind,
        display_name: &str,
        requested_labels: &[S],
    ) -> Result<MetricDescriptor> {
        Ok(MetricDescriptor {
            key: key.to_string(),
            kind,
            name: MetricName::prefixed(&self.prefix, display_name)?,
            label_names: register_label_names(requested_labels),
        })
    }

    /// Registers a counter.
    ///
    /// Counters are exposed with the `_total` suffix of the text format.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::DuplicateMetric` if the key is taken,
    /// `MetricsError::DuplicateName` if the prefixed name is already exposed,
    /// or `MetricsError::InvalidMetricName` if the prefixed name is invalid.
    /// Nothing is registered on error.
    pub fn try_register_counter<S: AsRef<str>>(
        &self,
        key: &str,
        display_name: &str,
        help: &str,
        requested_labels: &[S],
    ) -> Result<()> {
        let descriptor = self.prepare(key, MetricKind::Counter, display_name, requested_labels)?;

        let mut metrics = self.metrics.write();
        metrics.check_vacant(&descriptor)?;

        let vector = CounterVector::new(descriptor.label_names.clone());
        self.registry
            .write()
            .register(descriptor.name.as_str(), help, vector.family());
        debug!(
            key = %key,
            name = %descriptor.name,
            labels = ?descriptor.label_names,
            "registered counter"
        );
        metrics.insert(RegisteredMetric::Counter { descriptor, vector });
        Ok(())
    }

    /// Registers a counter. Returns `false` if the key or name is taken or the name is invalid.
    pub fn register_counter<S: AsRef<str>>(
        &self,
        key: &str,
        display_name: &str,
        help: &str,
        requested_labels: &[S],
    ) -> bool {
        match self.try_register_counter(key, display_name, help, requested_labels) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "counter registration rejected");
                false
            }
        }
    }

    /// Registers a gauge and hands its delete capability to the cleaner.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::DuplicateMetric` if the key is taken,
    /// `MetricsError::DuplicateName` if the prefixed name is already exposed,
    /// or `MetricsError::InvalidMetricName` if the prefixed name is invalid.
    /// Nothing is registered on error.
    pub fn try_register_gauge<S: AsRef<str>>(
        &self,
        key: &str,
        display_name: &str,
        help: &str,
        requested_labels: &[S],
    ) -> Result<()> {
        let descriptor = self.prepare(key, MetricKind::Gauge, display_name, requested_labels)?;

        let mut metrics = self.metrics.write();
        metrics.check_vacant(&descriptor)?;

        let vector = GaugeVector::new(descriptor.label_names.clone());
        self.registry
            .write()
            .register(descriptor.name.as_str(), help, vector.family());
        self.cleaner.register_gauge(key, Arc::new(vector.clone()));
        debug!(
            key = %key,
            name = %descriptor.name,
            labels = ?descriptor.label_names,
            "registered gauge"
        );
        metrics.insert(RegisteredMetric::Gauge { descriptor, vector });
        Ok(())
    }

    /// Registers a gauge. Returns `false` if the key or name is taken or the name is invalid.
    pub fn register_gauge<S: AsRef<str>>(
        &self,
        key: &str,
        display_name: &str,
        help: &str,
        requested_labels: &[S],
    ) -> bool {
        match self.try_register_gauge(key, display_name, help, requested_labels) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "gauge registration rejected");
                false
            }
        }
    }

    /// Increments the counter series for a device. Unknown keys are ignored.
    pub fn increment_counter(&self, key: &str, device_id: &str, extra_labels: &LabelMap) {
        let metrics = self.metrics.read();
        let Some(RegisteredMetric::Counter { descriptor, vector }) = metrics.by_key.get(key) else {
            debug!(key = %key, "increment for unregistered counter ignored");
            return;
        };

        let labels = resolve_label_values(self.directory.as_ref(), device_id, extra_labels);
        vector.increment(&project_to_vector(&descriptor.label_names, &labels));
    }

    /// Sets the gauge series for a device and reports the update to the cleaner.
    ///
    /// Unknown keys are ignored. Waits for queue space when the cleaner's
    /// update queue is full.
    pub async fn set_gauge(&self, key: &str, device_id: &str, extra_labels: &LabelMap, value: f64) {
        let (label_names, vector) = {
            let metrics = self.metrics.read();
            let Some(RegisteredMetric::Gauge { descriptor, vector }) = metrics.by_key.get(key) else {
                debug!(key = %key, "set for unregistered gauge ignored");
                return;
            };
            (descriptor.label_names.clone(), vector.clone())
        };

        let labels = resolve_label_values(self.directory.as_ref(), device_id, extra_labels);
        vector.set(&project_to_vector(&label_names, &labels), value);
        self.cleaner
            .report_update(SeriesUpdate {
                key: key.to_string(),
                labels,
            })
            .await;
    }

    /// Encodes every series in the Prometheus text format.
    #[must_use]
    pub fn encode(&self) -> String {
        let registry = self.registry.read();
        let mut buffer = String::new();
        if encode(&mut buffer, &registry).is_err() {
            tracing::error!("failed to encode metrics");
            return String::new();
        }
        buffer
    }

    /// Content-Type of [`encode`](Self::encode) output.
    #[must_use]
    pub const fn content_type() -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }

    /// Stops the cleaner. Gauge updates afterwards are no longer tracked.
    pub async fn shutdown(&self) {
        self.cleaner.shutdown().await;
        debug!(prefix = %self.prefix, "metric registry shut down");
    }
}
