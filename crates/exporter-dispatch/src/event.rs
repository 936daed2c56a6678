//! Decoded telemetry events.

use exporter_metrics::LabelMap;
use serde::{Deserialize, Serialize};

/// One decoded reading, as produced by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Registry key of the metric the reading belongs to.
    pub metric_key: String,
    /// Identifier of the reporting device.
    pub device_id: String,
    /// Labels beyond the device identity.
    #[serde(default)]
    pub labels: LabelMap,
    /// The reading.
    pub value: f64,
}

impl TelemetryEvent {
    /// Creates an event without extra labels.
    #[must_use]
    pub fn new(metric_key: impl Into<String>, device_id: impl Into<String>, value: f64) -> Self {
        Self {
            metric_key: metric_key.into(),
            device_id: device_id.into(),
            labels: LabelMap::new(),
            value,
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let event = TelemetryEvent::new("rssiGauge", "dev1", -52.0).with_label("ssid", "home");
        assert_eq!(event.metric_key, "rssiGauge");
        assert_eq!(event.device_id, "dev1");
        assert_eq!(event.labels.get("ssid").map(String::as_str), Some("home"));
        assert!((event.value + 52.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserializes_without_labels() {
        let event: TelemetryEvent =
            serde_json::from_str(r#"{"metric_key":"uptime","device_id":"dev1","value":3.0}"#)
                .unwrap();
        assert!(event.labels.is_empty());
    }
}
