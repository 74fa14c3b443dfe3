//! Append-only event log of every activity record generated during a run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::agent::{ActivityKind, AgentRef, HabitSchedule, MemberKey, Mood, TaskCategory};
use crate::sim::phase::Phase;

/// Category of a logged event. Each kind maps onto exactly one aggregate
/// counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CalendarEvent,
    Task,
    Document,
    Survey,
    SurveyResponse,
    Interview,
    Meeting,
    Message,
    Contact,
    Habit,
    HabitCompletion,
    Question,
    Decision,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::CalendarEvent,
        EventKind::Task,
        EventKind::Document,
        EventKind::Survey,
        EventKind::SurveyResponse,
        EventKind::Interview,
        EventKind::Meeting,
        EventKind::Message,
        EventKind::Contact,
        EventKind::Habit,
        EventKind::HabitCompletion,
        EventKind::Question,
        EventKind::Decision,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::CalendarEvent => "calendar_event",
            EventKind::Task => "task",
            EventKind::Document => "document",
            EventKind::Survey => "survey",
            EventKind::SurveyResponse => "survey_response",
            EventKind::Interview => "interview",
            EventKind::Meeting => "meeting",
            EventKind::Message => "message",
            EventKind::Contact => "contact",
            EventKind::Habit => "habit",
            EventKind::HabitCompletion => "habit_completion",
            EventKind::Question => "question",
            EventKind::Decision => "decision",
        }
    }
}

/// Where a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Routine,
    Decision,
    Suggestion,
    Boredom,
}

/// Delivery channel of an inbound communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageChannel {
    Email,
    Sms,
}

/// Typed payload of a single generated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityRecord {
    Task {
        title: String,
        category: TaskCategory,
        assignee: MemberKey,
        source: TaskSource,
    },
    CalendarEvent {
        title: String,
        activity: ActivityKind,
        start: NaiveDateTime,
        duration_minutes: u32,
        attendees: Vec<MemberKey>,
    },
    Survey {
        survey_number: u32,
    },
    SurveyResponse {
        survey_number: u32,
        respondent: MemberKey,
        reported_load: f64,
    },
    InterviewSession {
        member: MemberKey,
        mood: Mood,
        summary: String,
    },
    Meeting {
        meeting_number: u32,
        agenda: Vec<String>,
    },
    Document {
        title: String,
        uploaded_by: MemberKey,
    },
    InboundMessage {
        contact: String,
        channel: MessageChannel,
        subject: String,
    },
    Contact {
        name: String,
        organization: String,
        channel: MessageChannel,
    },
    Habit {
        title: String,
        owner: MemberKey,
        schedule: HabitSchedule,
        duration_minutes: u32,
    },
    HabitCompletion {
        title: String,
        owner: MemberKey,
        probability: f64,
    },
    Question {
        asked_by: MemberKey,
        topic: String,
        question: String,
        follow_ups: Vec<String>,
    },
    Decision {
        member: MemberKey,
        action: String,
        rationale: String,
        urgency: String,
        fallback: bool,
    },
}

impl ActivityRecord {
    pub fn kind(&self) -> EventKind {
        match self {
            ActivityRecord::Task { .. } => EventKind::Task,
            ActivityRecord::CalendarEvent { .. } => EventKind::CalendarEvent,
            ActivityRecord::Survey { .. } => EventKind::Survey,
            ActivityRecord::SurveyResponse { .. } => EventKind::SurveyResponse,
            ActivityRecord::InterviewSession { .. } => EventKind::Interview,
            ActivityRecord::Meeting { .. } => EventKind::Meeting,
            ActivityRecord::Document { .. } => EventKind::Document,
            ActivityRecord::InboundMessage { .. } => EventKind::Message,
            ActivityRecord::Contact { .. } => EventKind::Contact,
            ActivityRecord::Habit { .. } => EventKind::Habit,
            ActivityRecord::HabitCompletion { .. } => EventKind::HabitCompletion,
            ActivityRecord::Question { .. } => EventKind::Question,
            ActivityRecord::Decision { .. } => EventKind::Decision,
        }
    }
}

/// One entry in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub timestamp: NaiveDateTime,
    pub day: u32,
    pub phase: Phase,
    pub kind: EventKind,
    pub agent: Option<AgentRef>,
    pub payload: ActivityRecord,
}

/// Ordered, append-only record of every generated activity.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<EventEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return the stored entry.
    pub fn append(
        &mut self,
        timestamp: NaiveDateTime,
        day: u32,
        phase: Phase,
        agent: Option<AgentRef>,
        payload: ActivityRecord,
    ) -> &EventEntry {
        let entry = EventEntry {
            sequence: self.entries.len() as u64,
            timestamp,
            day,
            phase,
            kind: payload.kind(),
            agent,
            payload,
        };
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[EventEntry] {
        &self.entries
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &EventEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    pub fn on_day(&self, day: u32) -> impl Iterator<Item = &EventEntry> {
        self.entries.iter().filter(move |e| e.day == day)
    }

    pub fn in_phase(&self, phase: Phase) -> impl Iterator<Item = &EventEntry> {
        self.entries.iter().filter(move |e| e.phase == phase)
    }

    pub fn for_member(&self, key: MemberKey) -> impl Iterator<Item = &EventEntry> {
        self.entries
            .iter()
            .filter(move |e| e.agent.as_ref().is_some_and(|a| a.key == key))
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.of_kind(kind).count() as u64
    }

    /// Evenly strided sample of at most `limit` entries, always including the
    /// last entry when the log is non-empty.
    pub fn sample(&self, limit: usize) -> Vec<EventEntry> {
        if limit == 0 || self.entries.is_empty() {
            return Vec::new();
        }
        if self.entries.len() <= limit {
            return self.entries.clone();
        }
        let stride = self.entries.len().div_ceil(limit);
        let mut sample: Vec<EventEntry> = self
            .entries
            .iter()
            .step_by(stride)
            .take(limit)
            .cloned()
            .collect();
        if let Some(last) = self.entries.last() {
            if sample.last().map(|e| e.sequence) != Some(last.sequence) {
                if sample.len() == limit {
                    sample.pop();
                }
                sample.push(last.clone());
            }
        }
        sample
    }
}
