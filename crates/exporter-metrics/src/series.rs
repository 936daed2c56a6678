//! Positional series storage on top of `prometheus-client` families.
//!
//! A vector is created with its ordered label names and afterwards addressed
//! with label values in the same order. Gauges additionally expose the
//! [`DeletableGauge`] capability the cleaner uses to evict series.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;

use crate::labels::project_to_vector;
use crate::types::LabelMap;

/// Label set of one stored series: `(name, value)` pairs in registration order.
pub type SeriesLabels = Vec<(String, String)>;

/// Handle to a single gauge series.
pub type GaugeHandle = Gauge<f64, AtomicU64>;

/// Handle to a single counter series.
pub type CounterHandle = Counter;

fn series_labels(names: &[String], values: &[String]) -> SeriesLabels {
    debug_assert_eq!(names.len(), values.len(), "label values must match label names");
    names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), values.get(i).cloned().unwrap_or_default()))
        .collect()
}

/// Narrow capability over a gauge vector, handed to the cleaner.
///
/// Works on label maps rather than positional values so the holder does not
/// need to know the registration order.
pub trait DeletableGauge: Send + Sync + std::fmt::Debug {
    /// Removes the series for the given labels. Returns `false` if it did not exist.
    fn delete(&self, labels: &LabelMap) -> bool;

    /// Returns the series for the given labels, creating it at zero if needed.
    fn get_or_create(&self, labels: &LabelMap) -> GaugeHandle;
}

/// Counter series addressed by positional label values.
#[derive(Debug, Clone)]
pub struct CounterVector {
    label_names: Arc<[String]>,
    family: Family<SeriesLabels, CounterHandle>,
}

impl CounterVector {
    /// Creates an empty counter vector over the given label names.
    #[must_use]
    pub fn new(label_names: Vec<String>) -> Self {
        Self {
            label_names: label_names.into(),
            family: Family::default(),
        }
    }

    /// The ordered label names.
    #[must_use]
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Increments the series and returns its previous value.
    pub fn increment(&self, values: &[String]) -> u64 {
        let labels = series_labels(&self.label_names, values);
        self.family.get_or_create(&labels).inc()
    }

    /// Removes the series. Returns `false` if it did not exist.
    pub fn delete(&self, values: &[String]) -> bool {
        self.family.remove(&series_labels(&self.label_names, values))
    }

    /// Shared handle to the underlying family, for registration with an exposition registry.
    pub(crate) fn family(&self) -> Family<SeriesLabels, CounterHandle> {
        self.family.clone()
    }
}

/// Gauge series addressed by positional label values.
///
/// Clones share the same series.
#[derive(Debug, Clone)]
pub struct GaugeVector {
    label_names: Arc<[String]>,
    family: Family<SeriesLabels, GaugeHandle>,
}

impl GaugeVector {
    /// Creates an empty gauge vector over the given label names.
    #[must_use]
    pub fn new(label_names: Vec<String>) -> Self {
        Self {
            label_names: label_names.into(),
            family: Family::default(),
        }
    }

    /// The ordered label names.
    #[must_use]
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Sets the series value.
    pub fn set(&self, values: &[String], value: f64) {
        let labels = series_labels(&self.label_names, values);
        self.family.get_or_create(&labels).set(value);
    }

    /// Removes the series. Returns `false` if it did not exist.
    pub fn delete(&self, values: &[String]) -> bool {
        self.family.remove(&series_labels(&self.label_names, values))
    }

    pub(crate) fn family(&self) -> Family<SeriesLabels, GaugeHandle> {
        self.family.clone()
    }
}

impl DeletableGauge for GaugeVector {
    fn delete(&self, labels: &LabelMap) -> bool {
        Self::delete(self, &project_to_vector(&self.label_names, labels))
    }

    fn get_or_create(&self, labels: &LabelMap) -> GaugeHandle {
        let labels = series_labels(&self.label_names, &project_to_vector(&self.label_names, labels));
        self.family.get_or_create(&labels).clone()
    }
}
