//! Telemetry collectors.
//!
//! A collector receives every dispatched event and decides for itself which
//! ones it handles. The stock collectors route a configured set of metric keys
//! into a shared [`MetricRegistry`].

use std::collections::HashSet;
use std::sync::Arc;

use exporter_metrics::{MetricRegistry, MetricsError};
use tracing::debug;

use crate::event::TelemetryEvent;

/// A consumer of dispatched telemetry events.
///
/// Each registered collector runs in its own task and sees every event.
pub trait Collector: Send + Sync + 'static {
    /// Name used in logs and as the `exporter_module` label.
    fn name(&self) -> &str;

    /// Whether this collector handles the event. Rejected events are counted as ignored.
    fn accepts(&self, event: &TelemetryEvent) -> bool;

    /// Handles an accepted event.
    fn handle(&self, event: &TelemetryEvent) -> impl std::future::Future<Output = ()> + Send;
}

/// Collector that sets gauges from event values.
#[derive(Debug)]
pub struct GaugeCollector {
    name: String,
    registry: Arc<MetricRegistry>,
    keys: HashSet<String>,
}

impl GaugeCollector {
    /// Creates a collector that routes nothing yet.
    #[must_use]
    pub fn new(name: impl Into<String>, registry: Arc<MetricRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
            keys: HashSet::new(),
        }
    }

    /// Registers a gauge in the registry and routes its key to this collector.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if the gauge cannot be registered.
    pub fn with_gauge<S: AsRef<str>>(
        mut self,
        key: &str,
        display_name: &str,
        help: &str,
        labels: &[S],
    ) -> Result<Self, MetricsError> {
        self.registry.try_register_gauge(key, display_name, help, labels)?;
        self.keys.insert(key.to_string());
        Ok(self)
    }

    /// Routes a key registered elsewhere to this collector.
    #[must_use]
    pub fn with_route(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    /// Whether the collector routes the key.
    #[must_use]
    pub fn routes(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

impl Collector for GaugeCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, event: &TelemetryEvent) -> bool {
        self.routes(&event.metric_key)
    }

    fn handle(&self, event: &TelemetryEvent) -> impl std::future::Future<Output = ()> + Send {
        debug!(collector = %self.name, key = %event.metric_key, device = %event.device_id, "setting gauge");
        self.registry
            .set_gauge(&event.metric_key, &event.device_id, &event.labels, event.value)
    }
}

/// Collector that counts events, one increment per event.
///
/// Event values are not used.
#[derive(Debug)]
pub struct CounterCollector {
    name: String,
    registry: Arc<MetricRegistry>,
    keys: HashSet<String>,
}

impl CounterCollector {
    /// Creates a collector that routes nothing yet.
    #[must_use]
    pub fn new(name: impl Into<String>, registry: Arc<MetricRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
            keys: HashSet::new(),
        }
    }

    /// Registers a counter in the registry and routes its key to this collector.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if the counter cannot be registered.
    pub fn with_counter<S: AsRef<str>>(
        mut self,
        key: &str,
        display_name: &str,
        help: &str,
        labels: &[S],
    ) -> Result<Self, MetricsError> {
        self.registry.try_register_counter(key, display_name, help, labels)?;
        self.keys.insert(key.to_string());
        Ok(self)
    }

    /// Routes a key registered elsewhere to this collector.
    #[must_use]
    pub fn with_route(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    /// Whether the collector routes the key.
    #[must_use]
    pub fn routes(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

impl Collector for CounterCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, event: &TelemetryEvent) -> bool {
        self.routes(&event.metric_key)
    }

    fn handle(&self, event: &TelemetryEvent) -> impl std::future::Future<Output = ()> + Send {
        self.registry
            .increment_counter(&event.metric_key, &event.device_id, &event.labels);
        std::future::ready(())
    }
}
