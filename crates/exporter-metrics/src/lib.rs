//! Label-indexed metric store with TTL eviction of gauge series.
#![forbid(unsafe_code)]
//!
//! `exporter-metrics` keeps counters and gauges for device telemetry. Every
//! series is labelled with the device's identity, resolved from a
//! [`DeviceDirectory`], and gauges that stop receiving updates are removed
//! after a configurable timeout so a retired sensor's last reading does not
//! stay visible forever.
//!
//! # Components
//!
//! - **Label pipeline** ([`labels`]): canonical label names for a registration
//!   and complete label values for an update
//! - **Metric registry** ([`MetricRegistry`]): registration, updates and text exposition
//! - **Gauge cleaner** ([`GaugeCleaner`]): background TTL eviction fed by gauge updates
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use exporter_metrics::{DeviceEntry, ExporterConfig, LabelMap, MetricRegistry, StaticDirectory};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> exporter_metrics::Result<()> {
//! let directory = StaticDirectory::new()
//!     .with_device(DeviceEntry::new("tasmota_1", "Living room", "home"));
//! let config = ExporterConfig::new("tasmota").with_cleaner_timeout(Duration::from_secs(300));
//! let registry = MetricRegistry::new(&config, Arc::new(directory))?;
//!
//! registry.try_register_counter("restarts", "restarts", "Device restarts", &["reason"])?;
//! let labels: LabelMap = [("reason".to_string(), "power".to_string())].into_iter().collect();
//! registry.increment_counter("restarts", "tasmota_1", &labels);
//!
//! assert!(registry.encode().contains("tasmota_restarts_total"));
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/exporter-metrics/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cleaner;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod labels;
pub mod registry;
pub mod series;
pub mod types;

// Re-export main types at crate root
pub use cleaner::{calculate_identity, GaugeCleaner, SeriesIdentity, SeriesUpdate, UpdateRecord};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ExporterConfig;
pub use directory::{DeviceDirectory, DeviceEntry, StaticDirectory};
pub use error::{MetricsError, Result};
pub use labels::{project_to_vector, register_label_names, resolve_label_values};
pub use registry::MetricRegistry;
pub use series::{CounterVector, DeletableGauge, GaugeVector};
pub use types::{prefixed_name, LabelMap, MetricDescriptor, MetricKind, MetricName};
