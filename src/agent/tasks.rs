//! Task categories, per-persona task templates and habits.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::sim::Phase;

/// Category of a household task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Household,
    Errands,
    Childcare,
    Schoolwork,
    /// Scheduling and logistics that someone has to notice first.
    Coordination,
    /// Anticipating, remembering and tracking.
    Invisible,
}

impl TaskCategory {
    /// Whether this category is plainly visible work.
    pub fn is_visible(self) -> bool {
        !matches!(self, TaskCategory::Coordination | TaskCategory::Invisible)
    }

    /// Earliest phase in which members who start out unaware of this kind of
    /// work begin to pick it up.
    pub fn unlocked_at(self) -> Phase {
        match self {
            TaskCategory::Coordination => Phase::Integration,
            TaskCategory::Invisible => Phase::Balanced,
            _ => Phase::Chaos,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Household => "household",
            TaskCategory::Errands => "errands",
            TaskCategory::Childcare => "childcare",
            TaskCategory::Schoolwork => "schoolwork",
            TaskCategory::Coordination => "coordination",
            TaskCategory::Invisible => "invisible",
        }
    }
}

/// A candidate task a persona might take on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTemplate {
    pub title: &'static str,
    pub category: TaskCategory,
    pub min_phase: Phase,
}

impl TaskTemplate {
    /// A template gated on its category's unlock phase.
    pub const fn gated(title: &'static str, category: TaskCategory, min_phase: Phase) -> Self {
        Self {
            title,
            category,
            min_phase,
        }
    }

    /// A template available from the first phase on.
    pub const fn always(title: &'static str, category: TaskCategory) -> Self {
        Self {
            title,
            category,
            min_phase: Phase::Chaos,
        }
    }
}

/// Templates available during `phase`.
pub fn available_tasks(templates: &[TaskTemplate], phase: Phase) -> Vec<TaskTemplate> {
    templates
        .iter()
        .filter(|t| t.min_phase <= phase)
        .copied()
        .collect()
}

/// When a habit is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitSchedule {
    Daily,
    Weekdays,
    On(Weekday),
}

impl HabitSchedule {
    pub fn is_due(self, date: NaiveDate) -> bool {
        let weekday = date.weekday();
        match self {
            HabitSchedule::Daily => true,
            HabitSchedule::Weekdays => !matches!(weekday, Weekday::Sat | Weekday::Sun),
            HabitSchedule::On(day) => weekday == day,
        }
    }
}

/// A recurring habit with a fixed time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub title: String,
    pub schedule: HabitSchedule,
    /// Window start as (hour, minute).
    pub window_start: (u32, u32),
    /// Window end as (hour, minute).
    pub window_end: (u32, u32),
    pub duration_minutes: u32,
    pub active_from: Phase,
    #[serde(default)]
    pub announced: bool,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub completions: u32,
}

impl Habit {
    pub fn new(
        title: &str,
        schedule: HabitSchedule,
        window_start: (u32, u32),
        window_end: (u32, u32),
        duration_minutes: u32,
    ) -> Self {
        Self {
            title: title.to_string(),
            schedule,
            window_start,
            window_end,
            duration_minutes,
            active_from: Phase::Chaos,
            announced: false,
            attempts: 0,
            completions: 0,
        }
    }

    pub fn active_from(mut self, phase: Phase) -> Self {
        self.active_from = phase;
        self
    }

    pub fn is_active(&self, phase: Phase) -> bool {
        phase >= self.active_from
    }

    /// Record one attempt.
    pub fn record(&mut self, completed: bool) {
        self.attempts += 1;
        if completed {
            self.completions += 1;
        }
    }

    /// Observed completion rate, `None` before the first attempt.
    pub fn completion_rate(&self) -> Option<f64> {
        (self.attempts > 0).then(|| f64::from(self.completions) / f64::from(self.attempts))
    }
}
