//! What a completed (or cancelled) run hands back to the caller.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{AgentMetrics, MemberKey};
use crate::sim::clock::PhaseEntry;
use crate::sim::counters::AggregateCounters;
use crate::sim::events::EventEntry;
use crate::sim::phase::Phase;
use crate::sink::SinkStats;

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub seed: u64,
    pub start_date: NaiveDate,
    pub days_completed: u32,
    pub cancelled: bool,
    pub final_phase: Phase,
    pub phase_history: Vec<PhaseEntry>,
    pub counters: AggregateCounters,
    /// Bounded sample of the event log.
    pub event_sample: Vec<EventEntry>,
    pub agents: Vec<AgentMetrics>,
    /// Percent of all tasks assigned to each member.
    pub task_distribution: BTreeMap<MemberKey, f64>,
    /// Perception gap in effect at the end of the run.
    pub perception_gap: f64,
    /// All zero in dry-run mode.
    pub sink: SinkStats,
}

impl RunResult {
    /// True when every write reached the sink (always true in dry-run).
    pub fn fully_persisted(&self) -> bool {
        self.sink.fully_persisted()
    }

    pub fn agent(&self, key: MemberKey) -> Option<&AgentMetrics> {
        self.agents.iter().find(|a| a.key == key)
    }

    /// Human-readable summary table.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Run {} (seed {}): {} day(s) from {}{}",
            self.run_id,
            self.seed,
            self.days_completed,
            self.start_date,
            if self.cancelled { ", cancelled" } else { "" }
        );
        let _ = writeln!(out, "Final phase: {}", self.final_phase);
        let _ = writeln!(out);

        let _ = writeln!(out, "{:<24} {:>8}", "Category", "Count");
        let _ = writeln!(out, "{}", "-".repeat(33));
        for (label, count) in self.counters.rows() {
            let _ = writeln!(out, "{:<24} {:>8}", label, count);
        }
        let _ = writeln!(out, "{:<24} {:>8}", "total", self.counters.total());
        let _ = writeln!(out);

        let _ = writeln!(
            out,
            "{:<20} {:<12} {:>6} {:>7} {:>7} {:>7} {:>8}",
            "Member", "Mood", "Load", "Stress", "Aware", "Tasks%", "Habits%"
        );
        let _ = writeln!(out, "{}", "-".repeat(72));
        for agent in &self.agents {
            let share = self.task_distribution.get(&agent.key).copied().unwrap_or(0.0);
            let habits = agent
                .habit_completion_rate
                .map(|r| format!("{:.1}", r * 100.0))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<20} {:<12} {:>6.2} {:>7.2} {:>7.2} {:>7.1} {:>8}",
                agent.name,
                agent.mood.as_str(),
                agent.mental_load,
                agent.stress,
                agent.awareness,
                share,
                habits
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Perception gap: {:.3}", self.perception_gap);

        if self.sink.writes > 0 {
            let _ = writeln!(
                out,
                "Sink: {} write(s), {} failure(s)",
                self.sink.writes, self.sink.failures
            );
            if !self.fully_persisted() {
                let _ = writeln!(
                    out,
                    "WARNING: {} record(s) were simulated but not persisted",
                    self.sink.failures
                );
            }
        } else {
            let _ = writeln!(out, "Sink: dry run");
        }
        out
    }
}

/// Percent of `Task` events assigned to each member. Every member appears,
/// with 0.0 when no tasks exist.
pub fn task_distribution(
    assignees: impl IntoIterator<Item = MemberKey>,
) -> BTreeMap<MemberKey, f64> {
    let mut counts: BTreeMap<MemberKey, u64> = MemberKey::ALL.iter().map(|k| (*k, 0)).collect();
    let mut total = 0u64;
    for key in assignees {
        *counts.entry(key).or_default() += 1;
        total += 1;
    }
    counts
        .into_iter()
        .map(|(key, n)| {
            let share = if total == 0 {
                0.0
            } else {
                n as f64 * 100.0 / total as f64
            };
            (key, share)
        })
        .collect()
}
