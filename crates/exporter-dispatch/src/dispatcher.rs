//! Broadcast of telemetry events to collectors.
//!
//! Each collector gets its own receiver on a bounded broadcast channel and
//! its own task. Submitting never waits on a collector: one that falls more
//! than the channel capacity behind loses its oldest events, logs how many,
//! and carries on with the rest.

use std::sync::Arc;

use exporter_metrics::MetricRegistry;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::accounting::{MessageAccounting, ProcessingState};
use crate::collector::Collector;
use crate::config::DispatcherConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::event::TelemetryEvent;

#[derive(Debug)]
struct CollectorTask {
    name: String,
    handle: JoinHandle<()>,
}

/// Fans telemetry events out to every registered collector.
#[derive(Debug)]
pub struct Dispatcher {
    accounting: MessageAccounting,
    sender: Mutex<Option<broadcast::Sender<Arc<TelemetryEvent>>>>,
    collectors: Mutex<Vec<CollectorTask>>,
}

impl Dispatcher {
    /// Creates a dispatcher and registers the message accounting counters.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidConfig` for an invalid configuration, or
    /// `DispatchError::Metrics` if the accounting counters are already registered.
    pub fn new(config: &DispatcherConfig, registry: Arc<MetricRegistry>) -> DispatchResult<Self> {
        config.validate()?;
        let accounting = MessageAccounting::register(registry)?;
        let (sender, _) = broadcast::channel(config.channel_capacity);

        Ok(Self {
            accounting,
            sender: Mutex::new(Some(sender)),
            collectors: Mutex::new(Vec::new()),
        })
    }

    /// Subscribes a collector and spawns its task.
    ///
    /// The collector sees events submitted after this call.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Closed` after shutdown.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn register<C: Collector>(&self, collector: C) -> DispatchResult<()> {
        let receiver = match self.sender.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => return Err(DispatchError::Closed),
        };

        let name = collector.name().to_string();
        let handle = tokio::spawn(run_collector(collector, receiver, self.accounting.clone()));
        info!(collector = %name, "collector registered");
        self.collectors.lock().push(CollectorTask { name, handle });
        Ok(())
    }

    /// Submits an event to every collector.
    ///
    /// Returns the number of collectors the event was queued for. Only
    /// queued events count toward `total_message_count`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Closed` after shutdown and
    /// `DispatchError::NoCollectors` if nobody is subscribed.
    pub fn submit(&self, event: TelemetryEvent) -> DispatchResult<usize> {
        let sender = self.sender.lock().clone().ok_or(DispatchError::Closed)?;

        debug!(key = %event.metric_key, device = %event.device_id, "dispatching event");
        let event = Arc::new(event);
        let queued = sender
            .send(Arc::clone(&event))
            .map_err(|_| DispatchError::NoCollectors)?;
        self.accounting.received(&event.device_id);
        Ok(queued)
    }

    /// Number of registered collectors.
    #[must_use]
    pub fn collector_count(&self) -> usize {
        self.collectors.lock().len()
    }

    /// Names of the registered collectors, in registration order.
    #[must_use]
    pub fn collector_names(&self) -> Vec<String> {
        self.collectors
            .lock()
            .iter()
            .map(|task| task.name.clone())
            .collect()
    }

    /// Closes the channel and waits for every collector to drain its queue.
    pub async fn shutdown(&self) {
        self.sender.lock().take();

        let collectors = std::mem::take(&mut *self.collectors.lock());
        for task in collectors {
            if let Err(e) = task.handle.await {
                warn!(collector = %task.name, error = %e, "collector task ended abnormally");
            }
        }
        info!("dispatcher shut down");
    }
}

async fn run_collector<C: Collector>(
    collector: C,
    mut receiver: broadcast::Receiver<Arc<TelemetryEvent>>,
    accounting: MessageAccounting,
) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                if collector.accepts(&event) {
                    accounting.outcome(&event.device_id, collector.name(), ProcessingState::Processed);
                    collector.handle(&event).await;
                } else {
                    debug!(collector = %collector.name(), key = %event.metric_key, "event ignored");
                    accounting.outcome(&event.device_id, collector.name(), ProcessingState::Ignored);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(collector = %collector.name(), count = n, "collector lagged, dropped events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!(collector = %collector.name(), "collector stopped");
}
