//! Core observer trait and event/metric types.

use std::time::Duration;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::agent::MemberKey;
use crate::sim::Phase;

/// Receives progress events from a running simulation.
///
/// Implementations can log to tracing, collect for tests, or do nothing at
/// all. The orchestrator records events at run, day and phase boundaries.
///
/// Thread-safe and cheaply cloneable behind `Arc<dyn Observer>`.
pub trait Observer: Send + Sync {
    /// Record a discrete lifecycle event.
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric sample.
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data. No-op by default.
    fn flush(&self) {}

    /// Human-readable backend name (e.g. "noop", "log").
    fn name(&self) -> &str;
}

/// Discrete lifecycle events of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    RunStart {
        run_id: Uuid,
        seed: u64,
        start_date: NaiveDate,
        days: u32,
        write_mode: bool,
    },

    /// The household moved into a new phase.
    PhaseTransition { day: u32, from: Phase, to: Phase },

    /// A member's decision had to use the local rule.
    DecisionFallback { day: u32, member: MemberKey },

    /// One simulated day finished.
    DayComplete {
        day: u32,
        date: NaiveDate,
        phase: Phase,
        /// Events appended during this day.
        events: usize,
        /// Events in the log so far.
        total_events: usize,
    },

    /// Some sink writes failed at a checkpoint.
    SinkWritesFailed { day: u32, failures: u64 },

    /// The run stopped, either after the last day or on cancellation.
    RunEnd {
        days_completed: u32,
        cancelled: bool,
        total_events: usize,
        duration: Duration,
    },
}

/// Numeric metric samples.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverMetric {
    /// Events generated during one day.
    DayEvents(u64),
    /// Writes still in flight when a checkpoint started (gauge).
    SinkBacklog(u64),
    /// Wall-clock time spent on one simulated day.
    DayLatency(Duration),
}
