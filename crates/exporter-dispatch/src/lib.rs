//! Fan-out of decoded telemetry events to metric collectors.
#![forbid(unsafe_code)]
//!
//! The [`Dispatcher`] hands every submitted [`TelemetryEvent`] to each
//! registered [`Collector`]. Collectors run independently: a slow one loses
//! its oldest events instead of holding up the others. Stock collectors route
//! events into an [`exporter_metrics::MetricRegistry`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use exporter_dispatch::{Dispatcher, DispatcherConfig, GaugeCollector, TelemetryEvent};
//! use exporter_metrics::{ExporterConfig, MetricRegistry, StaticDirectory};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(MetricRegistry::new(
//!     &ExporterConfig::default(),
//!     Arc::new(StaticDirectory::new()),
//! )?);
//! let dispatcher = Dispatcher::new(&DispatcherConfig::default(), Arc::clone(&registry))?;
//!
//! let state = GaugeCollector::new("state", Arc::clone(&registry))
//!     .with_gauge("rssiGauge", "rssi", "WiFi signal strength", &["ssid"])?;
//! dispatcher.register(state)?;
//!
//! dispatcher.submit(TelemetryEvent::new("rssiGauge", "dev1", -52.0).with_label("ssid", "home"))?;
//! dispatcher.shutdown().await;
//!
//! assert!(registry.encode().contains("ssid=\"home\""));
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/exporter-dispatch/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod accounting;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;

// Re-export main types at crate root
pub use accounting::{MessageAccounting, ProcessingState};
pub use collector::{Collector, CounterCollector, GaugeCollector};
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult};
pub use event::TelemetryEvent;
