//! Message accounting counters.
//!
//! Every submitted event counts once in `total_message_count`. Every collector
//! then counts it in `message_count`, labelled with its own name and whether
//! it processed or ignored the event.

use std::sync::Arc;

use exporter_metrics::{LabelMap, MetricRegistry, MetricsError};
use serde::{Deserialize, Serialize};

/// Key and name of the received-events counter.
pub const TOTAL_MESSAGE_COUNT: &str = "total_message_count";
/// Key and name of the per-collector outcome counter.
pub const MESSAGE_COUNT: &str = "message_count";
/// Label holding the [`ProcessingState`].
pub const PROCESSING_STATE: &str = "processing_state";
/// Label holding the collector name.
pub const EXPORTER_MODULE: &str = "exporter_module";

const HELP: &str = "Count of messages processed";

/// What a collector did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    /// The collector accepted and handled the event.
    Processed,
    /// The collector did not accept the event.
    Ignored,
}

impl ProcessingState {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registers and increments the accounting counters.
#[derive(Debug, Clone)]
pub struct MessageAccounting {
    registry: Arc<MetricRegistry>,
}

impl MessageAccounting {
    /// Registers both counters in the registry.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::DuplicateMetric` if either key is already registered.
    pub fn register(registry: Arc<MetricRegistry>) -> Result<Self, MetricsError> {
        registry.try_register_counter(TOTAL_MESSAGE_COUNT, TOTAL_MESSAGE_COUNT, HELP, &[] as &[&str])?;
        registry.try_register_counter(
            MESSAGE_COUNT,
            MESSAGE_COUNT,
            HELP,
            &[PROCESSING_STATE, EXPORTER_MODULE],
        )?;
        Ok(Self { registry })
    }

    /// Counts a submitted event.
    pub fn received(&self, device_id: &str) {
        self.registry
            .increment_counter(TOTAL_MESSAGE_COUNT, device_id, &LabelMap::new());
    }

    /// Counts a collector's outcome for an event.
    pub fn outcome(&self, device_id: &str, module: &str, state: ProcessingState) {
        let labels: LabelMap = [
            (PROCESSING_STATE.to_string(), state.as_str().to_string()),
            (EXPORTER_MODULE.to_string(), module.to_string()),
        ]
        .into_iter()
        .collect();
        self.registry.increment_counter(MESSAGE_COUNT, device_id, &labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exporter_metrics::{ExporterConfig, StaticDirectory};
    use test_case::test_case;

    fn accounting() -> (Arc<MetricRegistry>, MessageAccounting) {
        let registry = Arc::new(
            MetricRegistry::new(&ExporterConfig::default(), Arc::new(StaticDirectory::new()))
                .unwrap(),
        );
        let accounting = MessageAccounting::register(Arc::clone(&registry)).unwrap();
        (registry, accounting)
    }

    #[test_case(ProcessingState::Processed, "processed" ; "processed")]
    #[test_case(ProcessingState::Ignored, "ignored" ; "ignored")]
    fn state_label_values(state: ProcessingState, expected: &str) {
        assert_eq!(state.as_str(), expected);
        assert_eq!(state.to_string(), expected);
    }

    #[test]
    fn registers_both_counters() {
        let (registry, _) = accounting();
        let message_count = registry.descriptor(MESSAGE_COUNT).unwrap();
        assert_eq!(
            message_count.label_names,
            vec!["processing_state", "exporter_module", "device", "group", "friendly_name"]
        );
        assert!(registry.descriptor(TOTAL_MESSAGE_COUNT).is_some());
    }

    #[test]
    fn second_registration_fails() {
        let (registry, _) = accounting();
        assert!(matches!(
            MessageAccounting::register(registry),
            Err(MetricsError::DuplicateMetric { .. })
        ));
    }

    #[test]
    fn counts_received_and_outcomes() {
        let (registry, accounting) = accounting();
        accounting.received("dev1");
        accounting.received("dev1");
        accounting.outcome("dev1", "state", ProcessingState::Processed);
        accounting.outcome("dev1", "sensor", ProcessingState::Ignored);

        let output = registry.encode();
        assert!(output.contains(
            "mqtt_exporter_total_message_count_total{device=\"dev1\",group=\"dev1\",friendly_name=\"dev1\"} 2"
        ));
        assert!(output.contains("processing_state=\"processed\",exporter_module=\"state\""));
        assert!(output.contains("processing_state=\"ignored\",exporter_module=\"sensor\""));
    }
}
