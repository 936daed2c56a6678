//! TTL eviction of gauge series.
//!
//! The [`GaugeCleaner`] remembers when each gauge series was last set and
//! removes series that have not been refreshed within the configured timeout.
//!
//! With a zero timeout the cleaner is disabled for its whole lifetime: gauges
//! are still registered, but updates are not queued and no task or timer is
//! created. Otherwise two tasks run until shutdown:
//!
//! - the receiver drains the bounded update queue into the record map
//! - the sweeper wakes every sweep interval and evicts expired series
//!
//! Setters wait for queue space when the queue is full, so an update is never
//! dropped on the floor.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::series::DeletableGauge;
use crate::types::{prefixed_name, LabelMap};

/// Name suffix of the counter of updates accepted by the cleaner.
pub const METRICS_UPDATES_COUNT: &str = "cleaner_update_count";
/// Name suffix of the gauge holding the duration of the last locked clean pass.
pub const METRICS_CLEAN_TIME: &str = "cleaner_clean_time";
/// Name suffix of the counter of evicted series.
pub const METRICS_CLEAN_COUNT: &str = "cleaner_clean_count";

const IDENTITY_DELIMITER: &str = " ";

/// Content hash identifying one series in the cleaner's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesIdentity([u8; 32]);

impl SeriesIdentity {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for SeriesIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Computes the identity of a series.
///
/// Label names are sorted first, so the result does not depend on the
/// iteration order of `labels`. The hashed text is the metric key followed by
/// ` name=value` for every label.
#[must_use]
pub fn calculate_identity(key: &str, labels: &LabelMap) -> SeriesIdentity {
    let mut pairs: Vec<(&String, &String)> = labels.iter().collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    for (name, value) in pairs {
        hasher.update(IDENTITY_DELIMITER.as_bytes());
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    SeriesIdentity(digest)
}

/// A gauge-set event reported to the cleaner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesUpdate {
    /// Registry key of the gauge.
    pub key: String,
    /// Complete resolved label map of the series.
    pub labels: LabelMap,
}

/// Bookkeeping for one tracked series.
#[derive(Debug, Clone)]
pub struct UpdateRecord {
    /// Identity the record is stored under.
    pub identity: SeriesIdentity,
    /// Registry key of the gauge.
    pub key: String,
    /// Labels used to delete the series.
    pub labels: LabelMap,
    /// When the series was last set.
    pub last_update: Instant,
}

/// Settings fixed at cleaner construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanerSettings {
    /// Eviction timeout. Zero disables the cleaner.
    pub timeout: Duration,
    /// Interval between sweeps.
    pub sweep_interval: Duration,
    /// Capacity of the update queue.
    pub queue_capacity: usize,
}

/// The cleaner's own metrics.
#[derive(Debug, Clone, Default)]
pub struct CleanerMetrics {
    updates: Counter,
    cleaned: Counter,
    clean_time: Gauge<f64, AtomicU64>,
}

impl CleanerMetrics {
    /// Exposed names of the cleaner metrics under the given prefix.
    #[must_use]
    pub fn names(prefix: &str) -> [String; 3] {
        [METRICS_UPDATES_COUNT, METRICS_CLEAN_TIME, METRICS_CLEAN_COUNT]
            .map(|name| prefixed_name(prefix, name))
    }

    /// Creates the cleaner metrics and registers them under the given prefix.
    pub fn register(registry: &mut Registry, prefix: &str) -> Self {
        let metrics = Self::default();
        let [updates, clean_time, cleaned] = Self::names(prefix);
        registry.register(
            updates,
            "Count of registered metrics update",
            metrics.updates.clone(),
        );
        registry.register(
            clean_time,
            "Metrics clean time in seconds - lock time only",
            metrics.clean_time.clone(),
        );
        registry.register(cleaned, "Removed metrics count", metrics.cleaned.clone());
        metrics
    }

    /// Updates accepted so far.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates.get()
    }

    /// Series evicted so far.
    #[must_use]
    pub fn cleaned(&self) -> u64 {
        self.cleaned.get()
    }

    /// Seconds spent holding the lock in the last clean pass.
    #[must_use]
    pub fn last_clean_seconds(&self) -> f64 {
        self.clean_time.get()
    }
}

#[derive(Debug)]
struct CleanerState {
    updates: RwLock<HashMap<SeriesIdentity, UpdateRecord>>,
    gauges: RwLock<HashMap<String, Arc<dyn DeletableGauge>>>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    metrics: CleanerMetrics,
}

impl CleanerState {
    fn is_expired(&self, record: &UpdateRecord, now: Instant) -> bool {
        now.saturating_duration_since(record.last_update) >= self.timeout
    }

    fn record(&self, update: SeriesUpdate) {
        let identity = calculate_identity(&update.key, &update.labels);
        let record = UpdateRecord {
            identity,
            key: update.key,
            labels: update.labels,
            last_update: self.clock.now(),
        };
        debug!(key = %record.key, identity = %identity, "recorded gauge update");
        self.updates.write().insert(identity, record);
    }

    fn sweep(&self) -> usize {
        if self.timeout.is_zero() {
            return 0;
        }

        let expired = self.expired_candidates();
        if expired.is_empty() {
            debug!("nothing to clean");
            return 0;
        }
        debug!(candidates = expired.len(), "cleaning expired gauges");
        self.evict(expired)
    }

    fn expired_candidates(&self) -> Vec<SeriesIdentity> {
        let now = self.clock.now();
        self.updates
            .read()
            .values()
            .filter(|record| self.is_expired(record, now))
            .map(|record| record.identity)
            .collect()
    }

    fn evict(&self, expired: Vec<SeriesIdentity>) -> usize {
        let started = std::time::Instant::now();
        let gauges = self.gauges.read();
        let mut updates = self.updates.write();
        let now = self.clock.now();
        let mut removed = 0;
        for identity in expired {
            let Some(record) = updates.get(&identity) else {
                continue;
            };
            // an update may have landed between the scan and the lock
            if !self.is_expired(record, now) {
                continue;
            }
            info!(key = %record.key, labels = ?record.labels, "cleaning expired gauge series");
            match gauges.get(&record.key) {
                Some(gauge) => {
                    gauge.delete(&record.labels);
                }
                None => warn!(key = %record.key, "no gauge registered for expired record"),
            }
            updates.remove(&identity);
            self.metrics.cleaned.inc();
            removed += 1;
        }
        drop(updates);
        drop(gauges);

        let elapsed = started.elapsed();
        self.metrics.clean_time.set(elapsed.as_secs_f64());
        debug!(removed, elapsed = ?elapsed, "cleaning completed");
        removed
    }
}

/// TTL eviction engine for gauge series.
#[derive(Debug)]
pub struct GaugeCleaner {
    state: Arc<CleanerState>,
    input: Mutex<Option<mpsc::Sender<SeriesUpdate>>>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl GaugeCleaner {
    /// Creates the cleaner and, when the timeout is non-zero, spawns its
    /// receiver and sweeper tasks.
    ///
    /// # Panics
    ///
    /// Panics if the timeout is non-zero and this is called outside a tokio runtime.
    pub fn start(settings: CleanerSettings, clock: Arc<dyn Clock>, metrics: CleanerMetrics) -> Self {
        let state = Arc::new(CleanerState {
            updates: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            timeout: settings.timeout,
            clock,
            metrics,
        });
        let (shutdown, shutdown_rx) = watch::channel(false);

        if settings.timeout.is_zero() {
            warn!("gauge cleaner timeout is 0, eviction disabled");
            return Self {
                state,
                input: Mutex::new(None),
                shutdown,
                tasks: Mutex::new(Vec::new()),
            };
        }

        let (input, input_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let receiver = tokio::spawn(receive(Arc::clone(&state), input_rx));
        let sweeper = tokio::spawn(sweep_periodically(
            Arc::clone(&state),
            settings.sweep_interval,
            shutdown_rx,
        ));
        info!(
            timeout = ?settings.timeout,
            interval = ?settings.sweep_interval,
            "gauge cleaner started"
        );

        Self {
            state,
            input: Mutex::new(Some(input)),
            shutdown,
            tasks: Mutex::new(vec![receiver, sweeper]),
        }
    }

    /// Whether eviction is turned on.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.state.timeout.is_zero()
    }

    /// The eviction timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.state.timeout
    }

    /// The cleaner's own metrics.
    #[must_use]
    pub fn metrics(&self) -> &CleanerMetrics {
        &self.state.metrics
    }

    /// Registers the delete capability of a gauge under its registry key.
    pub fn register_gauge(&self, key: impl Into<String>, gauge: Arc<dyn DeletableGauge>) {
        let key = key.into();
        debug!(key = %key, "registering gauge with cleaner");
        self.state.gauges.write().insert(key, gauge);
    }

    /// Whether a gauge is registered under the key.
    #[must_use]
    pub fn has_gauge(&self, key: &str) -> bool {
        self.state.gauges.read().contains_key(key)
    }

    /// Reports a gauge-set event.
    ///
    /// A no-op when the cleaner is disabled or shut down. Otherwise waits for
    /// queue space.
    pub async fn report_update(&self, update: SeriesUpdate) {
        let input = self.input.lock().clone();
        let Some(input) = input else {
            debug!(key = %update.key, "skipped update, cleaner not running");
            return;
        };

        self.state.metrics.updates.inc();
        if input.send(update).await.is_err() {
            debug!("cleaner receiver stopped, update discarded");
        }
    }

    /// Number of series currently tracked.
    #[must_use]
    pub fn tracked_series(&self) -> usize {
        self.state.updates.read().len()
    }

    /// Snapshot of the record for a series, if tracked.
    #[must_use]
    pub fn record(&self, key: &str, labels: &LabelMap) -> Option<UpdateRecord> {
        self.state
            .updates
            .read()
            .get(&calculate_identity(key, labels))
            .cloned()
    }

    /// Runs one sweep now and returns the number of evicted series.
    ///
    /// Always returns 0 when the cleaner is disabled.
    pub fn sweep(&self) -> usize {
        self.state.sweep()
    }

    /// Closes the update queue, stops the sweeper and waits for both tasks.
    pub async fn shutdown(&self) {
        self.input.lock().take();
        self.shutdown.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "gauge cleaner task ended abnormally");
            }
        }
    }
}

async fn receive(state: Arc<CleanerState>, mut input: mpsc::Receiver<SeriesUpdate>) {
    while let Some(update) = input.recv().await {
        state.record(update);
    }
    debug!("update queue closed, receiver stopped");
}

async fn sweep_periodically(
    state: Arc<CleanerState>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                state.sweep();
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::series::GaugeVector;
    use proptest::prelude::*;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn labels(pairs: &[(&str, &str)]) -> LabelMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn settings(timeout: Duration) -> CleanerSettings {
        CleanerSettings {
            timeout,
            sweep_interval: Duration::from_secs(5),
            queue_capacity: 10,
        }
    }

    fn rssi_gauge() -> GaugeVector {
        GaugeVector::new(vec!["ssid".to_string(), "device".to_string()])
    }

    fn update(ssid: &str) -> SeriesUpdate {
        SeriesUpdate {
            key: "rssiGauge".to_string(),
            labels: labels(&[("ssid", ssid), ("device", "dev1")]),
        }
    }

    /// Cleaner whose loops never run, so tests drive `record` and `sweep` directly.
    fn manual_cleaner(timeout: Duration, clock: &ManualClock) -> (GaugeCleaner, GaugeVector) {
        let state = Arc::new(CleanerState {
            updates: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            timeout,
            clock: Arc::new(clock.clone()),
            metrics: CleanerMetrics::default(),
        });
        let (shutdown, _) = watch::channel(false);
        let cleaner = GaugeCleaner {
            state,
            input: Mutex::new(None),
            shutdown,
            tasks: Mutex::new(Vec::new()),
        };
        let gauge = rssi_gauge();
        cleaner.register_gauge("rssiGauge", Arc::new(gauge.clone()));
        (cleaner, gauge)
    }

    fn set(gauge: &GaugeVector, cleaner: &GaugeCleaner, ssid: &str) {
        gauge.set(&[ssid.to_string(), "dev1".to_string()], -52.0);
        cleaner.state.record(update(ssid));
    }

    mod identity_tests {
        use super::*;

        #[test]
        fn identity_depends_on_key() {
            let l = labels(&[("device", "dev1")]);
            assert_ne!(calculate_identity("a", &l), calculate_identity("b", &l));
        }

        #[test]
        fn identity_depends_on_values() {
            let a = labels(&[("device", "dev1")]);
            let b = labels(&[("device", "dev2")]);
            assert_ne!(calculate_identity("k", &a), calculate_identity("k", &b));
        }

        #[test]
        fn identity_depends_on_names() {
            let a = labels(&[("device", "x")]);
            let b = labels(&[("group", "x")]);
            assert_ne!(calculate_identity("k", &a), calculate_identity("k", &b));
        }

        #[test]
        fn identity_displays_as_hex() {
            let identity = calculate_identity("k", &LabelMap::new());
            let text = identity.to_string();
            assert_eq!(text.len(), 64);
            assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(identity.as_bytes().len(), 32);
        }

        proptest! {
            #[test]
            fn prop_identity_is_order_independent(
                key in "[a-zA-Z]{1,16}",
                pairs in proptest::collection::vec(("[a-z_]{1,10}", "[ -~]{0,12}"), 0..10),
            ) {
                let forward: LabelMap = pairs.iter().cloned().collect();
                let mut reversed_pairs: Vec<(String, String)> = forward.clone().into_iter().collect();
                reversed_pairs.reverse();
                let mut reversed = LabelMap::with_capacity(reversed_pairs.len() * 4);
                for (name, value) in reversed_pairs {
                    reversed.insert(name, value);
                }
                prop_assert_eq!(calculate_identity(&key, &forward), calculate_identity(&key, &reversed));
            }
        }
    }

    mod disabled_tests {
        use super::*;

        #[test]
        fn zero_timeout_starts_nothing() {
            let cleaner = GaugeCleaner::start(
                settings(Duration::ZERO),
                Arc::new(ManualClock::new()),
                CleanerMetrics::default(),
            );
            assert!(!cleaner.is_active());
            assert!(cleaner.input.lock().is_none());
            assert!(cleaner.tasks.lock().is_empty());
        }

        #[tokio::test]
        async fn zero_timeout_ignores_updates_but_keeps_gauges() {
            let clock = ManualClock::new();
            let cleaner = GaugeCleaner::start(
                settings(Duration::ZERO),
                Arc::new(clock.clone()),
                CleanerMetrics::default(),
            );
            let gauge = rssi_gauge();
            cleaner.register_gauge("rssiGauge", Arc::new(gauge.clone()));
            gauge.set(&["home".to_string(), "dev1".to_string()], -52.0);

            cleaner.report_update(update("home")).await;
            assert!(cleaner.has_gauge("rssiGauge"));
            assert_eq!(cleaner.tracked_series(), 0);
            assert_eq!(cleaner.metrics().updates(), 0);

            clock.advance(Duration::from_secs(86_400));
            assert_eq!(cleaner.sweep(), 0);
            assert!(gauge.delete(&["home".to_string(), "dev1".to_string()]));
        }

        #[test]
        fn disabled_state_sweep_ignores_records() {
            let clock = ManualClock::new();
            let (cleaner, gauge) = manual_cleaner(Duration::ZERO, &clock);
            set(&gauge, &cleaner, "home");
            clock.advance(Duration::from_secs(3600));
            assert_eq!(cleaner.sweep(), 0);
        }
    }

    mod sweep_tests {
        use super::*;

        #[test]
        fn sweep_before_timeout_keeps_series() {
            let clock = ManualClock::new();
            let (cleaner, gauge) = manual_cleaner(TIMEOUT, &clock);
            set(&gauge, &cleaner, "home");

            clock.advance(TIMEOUT - Duration::from_millis(1));
            assert_eq!(cleaner.sweep(), 0);
            assert_eq!(cleaner.tracked_series(), 1);
        }

        #[test]
        fn sweep_at_timeout_removes_series() {
            let clock = ManualClock::new();
            let (cleaner, gauge) = manual_cleaner(TIMEOUT, &clock);
            set(&gauge, &cleaner, "home");

            clock.advance(TIMEOUT);
            assert_eq!(cleaner.sweep(), 1);
            assert_eq!(cleaner.tracked_series(), 0);
            assert!(!gauge.delete(&["home".to_string(), "dev1".to_string()]));
            assert_eq!(cleaner.metrics().cleaned(), 1);
            assert!(cleaner.metrics().last_clean_seconds() >= 0.0);
        }

        #[test]
        fn refresh_resets_expiry_baseline() {
            let clock = ManualClock::new();
            let (cleaner, gauge) = manual_cleaner(TIMEOUT, &clock);
            set(&gauge, &cleaner, "home");

            clock.advance(Duration::from_secs(20));
            set(&gauge, &cleaner, "home");
            assert_eq!(cleaner.tracked_series(), 1);

            clock.advance(Duration::from_secs(20));
            assert_eq!(cleaner.sweep(), 0);

            clock.advance(Duration::from_secs(10));
            assert_eq!(cleaner.sweep(), 1);
        }

        #[test]
        fn only_stale_series_are_removed() {
            let clock = ManualClock::new();
            let (cleaner, gauge) = manual_cleaner(TIMEOUT, &clock);
            set(&gauge, &cleaner, "old");
            clock.advance(Duration::from_secs(25));
            set(&gauge, &cleaner, "fresh");
            clock.advance(Duration::from_secs(5));

            assert_eq!(cleaner.sweep(), 1);
            assert!(cleaner.record("rssiGauge", &update("old").labels).is_none());
            assert!(cleaner.record("rssiGauge", &update("fresh").labels).is_some());
            assert!(gauge.delete(&["fresh".to_string(), "dev1".to_string()]));
        }

        #[test]
        fn record_without_registered_gauge_is_still_dropped() {
            let clock = ManualClock::new();
            let (cleaner, _) = manual_cleaner(TIMEOUT, &clock);
            cleaner.state.record(SeriesUpdate {
                key: "unknownGauge".to_string(),
                labels: labels(&[("device", "dev1")]),
            });

            clock.advance(TIMEOUT);
            assert_eq!(cleaner.sweep(), 1);
            assert_eq!(cleaner.tracked_series(), 0);
        }

        #[test]
        fn already_deleted_series_is_not_an_error() {
            let clock = ManualClock::new();
            let (cleaner, gauge) = manual_cleaner(TIMEOUT, &clock);
            set(&gauge, &cleaner, "home");
            assert!(gauge.delete(&["home".to_string(), "dev1".to_string()]));

            clock.advance(TIMEOUT);
            assert_eq!(cleaner.sweep(), 1);
            assert_eq!(cleaner.tracked_series(), 0);
        }

        #[test]
        fn update_between_scan_and_evict_keeps_series() {
            let clock = ManualClock::new();
            let (cleaner, gauge) = manual_cleaner(TIMEOUT, &clock);
            set(&gauge, &cleaner, "home");
            set(&gauge, &cleaner, "away");

            clock.advance(TIMEOUT);
            let candidates = cleaner.state.expired_candidates();
            assert_eq!(candidates.len(), 2);

            set(&gauge, &cleaner, "home");
            assert_eq!(cleaner.state.evict(candidates), 1);

            assert!(cleaner.record("rssiGauge", &update("home").labels).is_some());
            assert!(cleaner.record("rssiGauge", &update("away").labels).is_none());
            assert!(gauge.delete(&["home".to_string(), "dev1".to_string()]));
            assert_eq!(cleaner.metrics().cleaned(), 1);
        }

        #[test]
        fn record_keeps_latest_update_time() {
            let clock = ManualClock::new();
            let (cleaner, gauge) = manual_cleaner(TIMEOUT, &clock);
            set(&gauge, &cleaner, "home");
            let first = cleaner.record("rssiGauge", &update("home").labels).unwrap();

            clock.advance(Duration::from_secs(3));
            set(&gauge, &cleaner, "home");
            let second = cleaner.record("rssiGauge", &update("home").labels).unwrap();

            assert_eq!(second.last_update - first.last_update, Duration::from_secs(3));
            assert_eq!(second.identity, first.identity);
        }
    }

    mod loop_tests {
        use super::*;
        use crate::clock::SystemClock;

        async fn wait_for_tracked(cleaner: &GaugeCleaner, expected: usize) {
            for _ in 0..100 {
                if cleaner.tracked_series() == expected {
                    return;
                }
                tokio::task::yield_now().await;
            }
            assert_eq!(cleaner.tracked_series(), expected, "cleaner never tracked {expected} series");
        }

        #[tokio::test(start_paused = true)]
        async fn receiver_and_sweeper_evict_stale_series() {
            let cleaner = GaugeCleaner::start(
                settings(TIMEOUT),
                Arc::new(SystemClock),
                CleanerMetrics::default(),
            );
            let gauge = rssi_gauge();
            cleaner.register_gauge("rssiGauge", Arc::new(gauge.clone()));

            gauge.set(&["home".to_string(), "dev1".to_string()], -52.0);
            cleaner.report_update(update("home")).await;
            wait_for_tracked(&cleaner, 1).await;
            assert_eq!(cleaner.metrics().updates(), 1);

            tokio::time::sleep(Duration::from_secs(20)).await;
            assert_eq!(cleaner.tracked_series(), 1);

            tokio::time::sleep(Duration::from_secs(16)).await;
            wait_for_tracked(&cleaner, 0).await;
            assert!(!gauge.delete(&["home".to_string(), "dev1".to_string()]));

            cleaner.shutdown().await;
        }

        #[tokio::test(start_paused = true)]
        async fn updates_after_shutdown_are_ignored() {
            let cleaner = GaugeCleaner::start(
                settings(TIMEOUT),
                Arc::new(SystemClock),
                CleanerMetrics::default(),
            );
            cleaner.shutdown().await;
            assert!(cleaner.tasks.lock().is_empty());

            cleaner.report_update(update("home")).await;
            assert_eq!(cleaner.tracked_series(), 0);
            assert_eq!(cleaner.metrics().updates(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn full_queue_applies_backpressure_without_loss() {
            let cleaner = Arc::new(GaugeCleaner::start(
                CleanerSettings {
                    queue_capacity: 1,
                    ..settings(TIMEOUT)
                },
                Arc::new(SystemClock),
                CleanerMetrics::default(),
            ));

            for i in 0..25 {
                cleaner.report_update(update(&format!("net{i}"))).await;
            }
            wait_for_tracked(&cleaner, 25).await;
            assert_eq!(cleaner.metrics().updates(), 25);

            cleaner.shutdown().await;
        }
    }

    mod metrics_tests {
        use super::*;
        use prometheus_client::encoding::text::encode;

        #[test]
        fn cleaner_metrics_are_registered_with_prefix() {
            let mut registry = Registry::default();
            let metrics = CleanerMetrics::register(&mut registry, "mqtt_exporter");
            metrics.updates.inc();

            let mut out = String::new();
            encode(&mut out, &registry).unwrap();
            assert!(out.contains("mqtt_exporter_cleaner_update_count"));
            assert!(out.contains("mqtt_exporter_cleaner_clean_time"));
            assert!(out.contains("mqtt_exporter_cleaner_clean_count"));
        }
    }
}
