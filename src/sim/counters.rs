//! Run-level tallies, one per event category.

use serde::{Deserialize, Serialize};

use crate::sim::events::EventKind;

/// Aggregate counters describing the shape of a run.
///
/// Only [`AggregateCounters::increment`] mutates them, and the orchestrator
/// calls it in the same step that appends to the event log, so every field
/// equals the number of log entries of the matching kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounters {
    pub calendar_events: u64,
    pub tasks: u64,
    pub documents: u64,
    pub surveys: u64,
    pub survey_responses: u64,
    pub interviews: u64,
    pub meetings: u64,
    pub messages: u64,
    pub contacts: u64,
    pub habits: u64,
    pub habit_completions: u64,
    pub questions: u64,
    pub reasoning_interactions: u64,
}

impl AggregateCounters {
    pub fn increment(&mut self, kind: EventKind) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_add(1);
    }

    pub fn get(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::CalendarEvent => self.calendar_events,
            EventKind::Task => self.tasks,
            EventKind::Document => self.documents,
            EventKind::Survey => self.surveys,
            EventKind::SurveyResponse => self.survey_responses,
            EventKind::Interview => self.interviews,
            EventKind::Meeting => self.meetings,
            EventKind::Message => self.messages,
            EventKind::Contact => self.contacts,
            EventKind::Habit => self.habits,
            EventKind::HabitCompletion => self.habit_completions,
            EventKind::Question => self.questions,
            EventKind::Decision => self.reasoning_interactions,
        }
    }

    fn slot_mut(&mut self, kind: EventKind) -> &mut u64 {
        match kind {
            EventKind::CalendarEvent => &mut self.calendar_events,
            EventKind::Task => &mut self.tasks,
            EventKind::Document => &mut self.documents,
            EventKind::Survey => &mut self.surveys,
            EventKind::SurveyResponse => &mut self.survey_responses,
            EventKind::Interview => &mut self.interviews,
            EventKind::Meeting => &mut self.meetings,
            EventKind::Message => &mut self.messages,
            EventKind::Contact => &mut self.contacts,
            EventKind::Habit => &mut self.habits,
            EventKind::HabitCompletion => &mut self.habit_completions,
            EventKind::Question => &mut self.questions,
            EventKind::Decision => &mut self.reasoning_interactions,
        }
    }

    pub fn total(&self) -> u64 {
        EventKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    /// `(label, value)` pairs in a stable order, for reporting.
    pub fn rows(&self) -> Vec<(&'static str, u64)> {
        EventKind::ALL
            .iter()
            .map(|k| (k.as_str(), self.get(*k)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_touches_only_one_slot() {
        let mut counters = AggregateCounters::default();
        counters.increment(EventKind::Task);
        counters.increment(EventKind::Task);
        counters.increment(EventKind::Decision);
        assert_eq!(counters.tasks, 2);
        assert_eq!(counters.reasoning_interactions, 1);
        assert_eq!(counters.total(), 3);
    }

    #[test]
    fn get_and_increment_agree_for_every_kind() {
        let mut counters = AggregateCounters::default();
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            for _ in 0..=i {
                counters.increment(*kind);
            }
        }
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(counters.get(*kind), i as u64 + 1, "{kind:?}");
        }
    }
}
