//! Observer that captures all events into a shared vector.
//!
//! Used by tests to check what a run reported without parsing logs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::observability::traits::{Observer, ObserverEvent, ObserverMetric};

/// Observer that records all events for test assertions.
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ObserverEvent>>>,
    metrics: Arc<Mutex<Vec<ObserverMetric>>>,
    flush_count: Arc<AtomicU32>,
}

impl RecordingObserver {
    /// Create a new recording observer and return handles to the captured data.
    #[allow(clippy::type_complexity)]
    pub fn new() -> (
        Self,
        Arc<Mutex<Vec<ObserverEvent>>>,
        Arc<Mutex<Vec<ObserverMetric>>>,
    ) {
        let (obs, events, metrics, _) = Self::with_flush_counter();
        (obs, events, metrics)
    }

    /// Like [`new`](Self::new), also returning a shared flush counter.
    #[allow(clippy::type_complexity)]
    pub fn with_flush_counter() -> (
        Self,
        Arc<Mutex<Vec<ObserverEvent>>>,
        Arc<Mutex<Vec<ObserverMetric>>>,
        Arc<AtomicU32>,
    ) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let metrics = Arc::new(Mutex::new(Vec::new()));
        let flush_count = Arc::new(AtomicU32::new(0));
        (
            Self {
                events: Arc::clone(&events),
                metrics: Arc::clone(&metrics),
                flush_count: Arc::clone(&flush_count),
            },
            events,
            metrics,
            flush_count,
        )
    }
}

impl Observer for RecordingObserver {
    fn record_event(&self, event: &ObserverEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.push(metric.clone());
        }
    }

    fn flush(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    fn name(&self) -> &str {
        "recording"
    }
}
