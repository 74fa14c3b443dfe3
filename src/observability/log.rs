//! Tracing-based observer that emits structured log events.
//!
//! Events appear alongside normal application logs. Selected by `--verbose`.

use crate::observability::traits::{Observer, ObserverEvent, ObserverMetric};

/// Observer that logs events and metrics via `tracing`.
pub struct LogObserver;

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::RunStart {
                run_id,
                seed,
                start_date,
                days,
                write_mode,
            } => {
                tracing::info!(
                    run_id = %run_id,
                    seed,
                    start_date = %start_date,
                    days,
                    write_mode,
                    "observer: run.start"
                );
            }
            ObserverEvent::PhaseTransition { day, from, to } => {
                tracing::info!(day, from = %from, to = %to, "observer: phase.transition");
            }
            ObserverEvent::DecisionFallback { day, member } => {
                tracing::debug!(day, member = %member, "observer: decision.fallback");
            }
            ObserverEvent::DayComplete {
                day,
                date,
                phase,
                events,
                total_events,
            } => {
                tracing::info!(
                    day,
                    date = %date,
                    phase = %phase,
                    events,
                    total_events,
                    "observer: day.complete"
                );
            }
            ObserverEvent::SinkWritesFailed { day, failures } => {
                tracing::warn!(day, failures, "observer: sink.failures");
            }
            ObserverEvent::RunEnd {
                days_completed,
                cancelled,
                total_events,
                duration,
            } => {
                tracing::info!(
                    days_completed,
                    cancelled,
                    total_events,
                    duration_secs = duration.as_secs_f64(),
                    "observer: run.end"
                );
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::DayEvents(n) => {
                tracing::debug!(events = n, "observer: metric.day_events");
            }
            ObserverMetric::SinkBacklog(n) => {
                tracing::debug!(backlog = n, "observer: metric.sink_backlog");
            }
            ObserverMetric::DayLatency(d) => {
                tracing::debug!(
                    latency_us = d.as_micros() as u64,
                    "observer: metric.day_latency"
                );
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;

    use crate::observability::log::LogObserver;
    use crate::observability::traits::*;
    use crate::sim::Phase;

    #[test]
    fn name_is_log() {
        assert_eq!(LogObserver.name(), "log");
    }

    #[test]
    #[tracing_test::traced_test]
    fn day_and_phase_events_are_logged() {
        let obs = LogObserver;
        obs.record_event(&ObserverEvent::PhaseTransition {
            day: 61,
            from: Phase::Chaos,
            to: Phase::Discovery,
        });
        obs.record_event(&ObserverEvent::DayComplete {
            day: 61,
            date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            phase: Phase::Discovery,
            events: 14,
            total_events: 900,
        });
        obs.record_event(&ObserverEvent::SinkWritesFailed { day: 61, failures: 2 });
        assert!(logs_contain("observer: phase.transition"));
        assert!(logs_contain("observer: day.complete"));
        assert!(logs_contain("observer: sink.failures"));
    }

    #[test]
    fn record_metric_does_not_panic() {
        let obs = LogObserver;
        obs.record_metric(&ObserverMetric::DayEvents(12));
        obs.record_metric(&ObserverMetric::SinkBacklog(0));
        obs.record_metric(&ObserverMetric::DayLatency(Duration::from_micros(800)));
    }
}
