//! Observer that discards everything. Used unless `--verbose` is set.

use crate::observability::traits::{Observer, ObserverEvent, ObserverMetric};

pub struct NoopObserver;

impl Observer for NoopObserver {
    fn record_event(&self, _event: &ObserverEvent) {}

    fn record_metric(&self, _metric: &ObserverMetric) {}

    fn name(&self) -> &str {
        "noop"
    }
}
