//! An in-memory `metrics::Recorder` for the outcome counters.
//!
//! [`crate::RunMetrics`] reports every customer outcome through the `metrics`
//! facade. Installing a [`CounterRecorder`] as a *local* recorder captures those
//! counters without touching global state:
//!
//! ```rust
//! # use callsim_metrics::{CounterRecorder, RunMetrics};
//! let recorder = CounterRecorder::new();
//! recorder.capture(|| {
//!     let mut run = RunMetrics::new();
//!     run.record_blocked();
//! });
//! assert_eq!(recorder.counter("callsim_customers_total", &[("outcome", "blocked")]), 1);
//! ```

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type CounterMap = BTreeMap<(String, Vec<(String, String)>), Arc<AtomicU64>>;

/// Captures counters by name and sorted label set. Gauges and histograms are
/// discarded.
#[derive(Clone, Default)]
pub struct CounterRecorder {
    counters: Arc<Mutex<CounterMap>>,
}

impl CounterRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with this recorder installed for the current thread.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self, f)
    }

    /// Current value of a counter, zero if it was never incremented.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = (name.to_string(), owned_labels(labels.iter().copied()));
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map_or(0, |value| value.load(Ordering::Relaxed))
    }

    fn handle(&self, key: &Key) -> Arc<AtomicU64> {
        let labels = owned_labels(key.labels().map(|l| (l.key(), l.value())));
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters
            .entry((key.name().to_string(), labels))
            .or_default()
            .clone()
    }
}

fn owned_labels<'a>(labels: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<(String, String)> {
    let mut owned: Vec<(String, String)> = labels
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    owned.sort();
    owned
}

impl Recorder for CounterRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.handle(key))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}
