//! The day-by-day simulation loop.
//!
//! One [`Orchestrator`] owns the clock, the event log, the counters and the
//! household for exactly one run. Every simulated day runs the same fixed
//! sequence:
//!
//! 1. phase check, advancing every member on a boundary
//! 2. discovery interviews (days 1 to 5)
//! 3. weekly survey
//! 4. fortnightly family meeting (not during chaos)
//! 5. morning, day, afternoon and evening blocks
//! 6. document uploads and inbound messages
//! 7. habit pass
//! 8. overnight rest and clock advance
//!
//! Only decisions and sink writes are asynchronous. Sink writes never feed
//! back into the loop, so a run in write mode produces the same log as a dry
//! run with the same seed.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::{
    AgentRef, Decision, DecisionContext, Household, MemberKey, Persona, TaskCategory,
};
use crate::config::SimConfig;
use crate::error::{Result, SimulationError};
use crate::observability::{Observer, ObserverEvent, ObserverMetric};
use crate::sim::activities::{self, ADULT_EVENING_ACTIONS, CHILD_WEEKEND_ACTIONS};
use crate::sim::clock::{OVERNIGHT_MINUTES, SimulationClock, TimeBlock};
use crate::sim::contacts::{CONTACT_ROSTER, ContactBook, DAILY_MESSAGE_PROBABILITY};
use crate::sim::counters::AggregateCounters;
use crate::sim::events::{ActivityRecord, EventLog, TaskSource};
use crate::sim::phase::habit_completion_probability;
use crate::sim::result::{RunResult, task_distribution};
use crate::sink::{FamilySnapshot, Record, RecordSink, SinkDispatcher, SinkStats};
use crate::util::{mix_seed, unit};

/// Days between family snapshot updates.
const SNAPSHOT_INTERVAL_DAYS: u32 = 7;
const SURVEY_INTERVAL_DAYS: u32 = 7;
const MEETING_INTERVAL_DAYS: u32 = 14;
const INTERVIEW_DAYS: u32 = 5;

/// A record waiting to be appended, built while members are borrowed.
type Pending = (NaiveDateTime, Option<AgentRef>, ActivityRecord);

/// Drives the household through one simulated run.
pub struct Orchestrator {
    run_id: Uuid,
    config: SimConfig,
    household: Household,
    clock: SimulationClock,
    log: EventLog,
    counters: AggregateCounters,
    rng: StdRng,
    contacts: ContactBook,
    interviewed: [bool; 5],
    surveys: u32,
    meetings: u32,
    dispatcher: Option<SinkDispatcher>,
    observer: Arc<dyn Observer>,
    started: bool,
}

impl Orchestrator {
    /// Build a dry-run orchestrator. Attach a sink with
    /// [`with_sink`](Self::with_sink) for write mode.
    pub fn new(
        config: SimConfig,
        household: Household,
        observer: Arc<dyn Observer>,
    ) -> Result<Self> {
        if config.days == 0 {
            return Err(SimulationError::EmptyRun { days: config.days }.into());
        }
        Ok(Self {
            run_id: Uuid::new_v4(),
            clock: SimulationClock::new(config.start_date),
            rng: StdRng::seed_from_u64(mix_seed(config.seed, 0)),
            config,
            household,
            log: EventLog::new(),
            counters: AggregateCounters::default(),
            contacts: ContactBook::new(),
            interviewed: [false; 5],
            surveys: 0,
            meetings: 0,
            dispatcher: None,
            observer,
            started: false,
        })
    }

    /// Send every record to `sink` as well as the in-memory log.
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.dispatcher = Some(SinkDispatcher::new(sink, self.config.sink.concurrency));
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_dry_run(&self) -> bool {
        self.dispatcher.is_none()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn counters(&self) -> &AggregateCounters {
        &self.counters
    }

    pub fn household(&self) -> &Household {
        &self.household
    }

    /// Run every configured day, or until `cancel` fires.
    ///
    /// Cancellation is only checked between days, so the log and counters
    /// always describe whole days. An orchestrator runs at most once.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<RunResult> {
        if self.started {
            return Err(SimulationError::AlreadyRun.into());
        }
        self.started = true;
        let started_at = Instant::now();

        tracing::info!(
            run_id = %self.run_id,
            days = self.config.days,
            seed = self.config.seed,
            start_date = %self.config.start_date,
            speed = self.config.speed,
            dry_run = self.is_dry_run(),
            "Starting household simulation"
        );
        self.observer.record_event(&ObserverEvent::RunStart {
            run_id: self.run_id,
            seed: self.config.seed,
            start_date: self.config.start_date,
            days: self.config.days,
            write_mode: !self.is_dry_run(),
        });

        let mut cancelled = false;
        for _ in 0..self.config.days {
            if cancel.is_cancelled() {
                tracing::warn!(
                    days_completed = self.clock.days_elapsed(),
                    "Simulation cancelled"
                );
                cancelled = true;
                break;
            }
            self.run_day().await;
        }

        let days_completed = self.clock.days_elapsed();
        if days_completed > 0 {
            self.dispatch_snapshot(days_completed, true);
        }
        let sink = match self.dispatcher.as_mut() {
            Some(dispatcher) => dispatcher.finish().await,
            None => SinkStats::default(),
        };
        if !sink.fully_persisted() {
            tracing::warn!(
                writes = sink.writes,
                failures = sink.failures,
                "Run finished with unpersisted records"
            );
        }

        self.observer.record_event(&ObserverEvent::RunEnd {
            days_completed,
            cancelled,
            total_events: self.log.len(),
            duration: started_at.elapsed(),
        });
        self.observer.flush();
        tracing::info!(
            days_completed,
            events = self.log.len(),
            final_phase = %self.clock.phase(),
            "Simulation finished"
        );

        Ok(self.result(days_completed, cancelled, sink))
    }

    async fn run_day(&mut self) {
        let day_started = Instant::now();
        let day = self.clock.day_number();
        let events_before = self.log.len();

        self.check_phase(day);
        self.run_interview(day);
        self.run_survey(day);
        self.run_meeting(day);
        for block in TimeBlock::ALL {
            self.run_block(block).await;
        }
        self.run_documents();
        self.run_messages();
        self.run_habits();

        for member in self.household.members_mut() {
            member.agent_mut().tick(OVERNIGHT_MINUTES);
        }
        if day % SNAPSHOT_INTERVAL_DAYS == 0 {
            self.dispatch_snapshot(day, false);
        }
        self.checkpoint(day).await;

        let events = self.log.len() - events_before;
        tracing::debug!(
            day,
            date = %self.clock.date(),
            phase = %self.clock.phase(),
            events,
            "Day complete"
        );
        self.observer.record_event(&ObserverEvent::DayComplete {
            day,
            date: self.clock.date(),
            phase: self.clock.phase(),
            events,
            total_events: self.log.len(),
        });
        self.observer
            .record_metric(&ObserverMetric::DayEvents(events as u64));
        self.observer
            .record_metric(&ObserverMetric::DayLatency(day_started.elapsed()));

        self.clock.advance_day();
    }

    /// Move the clock and every member into the phase implied by the day.
    fn check_phase(&mut self, day: u32) {
        let target = self.config.phase_boundaries.phase_for(self.clock.days_elapsed());
        if let Some(previous) = self.clock.enter_phase(target) {
            for member in self.household.members_mut() {
                member.advance_phase(target);
            }
            tracing::info!(day, from = %previous, to = %target, "Phase transition");
            self.observer.record_event(&ObserverEvent::PhaseTransition {
                day,
                from: previous,
                to: target,
            });
        }

        let gap = self.config.perception_gap.gap(self.clock.phase());
        let partner_load = self.household.overloaded.agent().state().mental_load;
        self.household.under_aware.observe_partner(partner_load, gap);
    }

    fn run_interview(&mut self, day: u32) {
        if day == 0 || day > INTERVIEW_DAYS {
            return;
        }
        let key = MemberKey::ALL[(day - 1) as usize];
        if self.interviewed[key.index()] {
            return;
        }
        self.interviewed[key.index()] = true;

        let member = self.household.member(key);
        let payload = ActivityRecord::InterviewSession {
            member: key,
            mood: member.agent().state().mood,
            summary: activities::interview_summary(member),
        };
        let agent = Some(member.agent().agent_ref());
        let at = self.clock.timestamp(TimeBlock::Day, 60);
        self.record(at, agent, payload);
    }

    fn run_survey(&mut self, day: u32) {
        if day % SURVEY_INTERVAL_DAYS != 0 {
            return;
        }
        self.surveys += 1;
        let survey_number = self.surveys;
        let at = self.clock.timestamp(TimeBlock::Morning, 30);
        self.record(at, None, ActivityRecord::Survey { survey_number });

        for key in [MemberKey::UnderAwareAdult, MemberKey::OverloadedAdult] {
            let member = self.household.member(key);
            let rate = unit(member.agent().behavior().survey_completion_rate);
            if self.rng.gen_bool(rate) {
                let payload = ActivityRecord::SurveyResponse {
                    survey_number,
                    respondent: key,
                    reported_load: member.agent().state().mental_load,
                };
                let agent = Some(member.agent().agent_ref());
                let at = self.clock.timestamp(TimeBlock::Evening, 90);
                self.record(at, agent, payload);
            }
        }
    }

    fn run_meeting(&mut self, day: u32) {
        let phase = self.clock.phase();
        if day % MEETING_INTERVAL_DAYS != 0 || !phase.allows_meetings() {
            return;
        }
        self.meetings += 1;
        let payload = ActivityRecord::Meeting {
            meeting_number: self.meetings,
            agenda: activities::meeting_agenda(phase),
        };
        let at = self.clock.timestamp(TimeBlock::Evening, 60);
        self.record(at, None, payload);
    }

    async fn run_block(&mut self, block: TimeBlock) {
        for member in self.household.members_mut() {
            member.agent_mut().tick(block.duration_minutes());
        }

        self.run_child_schedules(block);
        if block == TimeBlock::Day {
            self.run_suggestion();
        }
        if block == TimeBlock::Afternoon && self.clock.is_weekend() {
            for key in [
                MemberKey::OldestChild,
                MemberKey::MiddleChild,
                MemberKey::YoungestChild,
            ] {
                self.run_decision(
                    key,
                    block,
                    "Free weekend afternoon",
                    &CHILD_WEEKEND_ACTIONS,
                )
                .await;
            }
        }
        if block == TimeBlock::Evening {
            for key in [MemberKey::UnderAwareAdult, MemberKey::OverloadedAdult] {
                self.run_decision(
                    key,
                    block,
                    "Evening after the kids' dinner",
                    &ADULT_EVENING_ACTIONS,
                )
                .await;
            }
            if !self.clock.is_weekend() {
                self.run_question();
            }
        }
        self.run_routines(block);
    }

    /// Scheduled child activities, then boredom.
    fn run_child_schedules(&mut self, block: TimeBlock) {
        let weekday = self.clock.weekday();
        let mut pending: Vec<Pending> = Vec::new();
        for child in self.household.children_mut() {
            let agent = Some(child.agent().agent_ref());
            let key = child.agent().key();
            let scheduled: Vec<_> = child
                .activities_in(weekday, block)
                .into_iter()
                .cloned()
                .collect();
            for activity in &scheduled {
                let start = self.clock.timestamp(block, 0);
                pending.push((
                    start,
                    agent.clone(),
                    ActivityRecord::CalendarEvent {
                        title: activity.name.clone(),
                        activity: activity.kind,
                        start,
                        duration_minutes: activity.duration_minutes,
                        attendees: vec![key],
                    },
                ));
            }
            if child.accumulate_boredom(block, !scheduled.is_empty()) {
                let at = self.clock.timestamp(block, block.duration_minutes() / 2);
                pending.push((
                    at,
                    agent,
                    ActivityRecord::Task {
                        title: "Find something to do".to_string(),
                        category: TaskCategory::Household,
                        assignee: key,
                        source: TaskSource::Boredom,
                    },
                ));
            }
        }
        self.record_all(pending);
    }

    /// The overloaded adult tries to hand one task over.
    fn run_suggestion(&mut self) {
        let phase = self.clock.phase();
        if !self.rng.gen_bool(activities::suggestion_probability(phase)) {
            return;
        }
        let Some(template) = self.household.overloaded.suggest_task() else {
            return;
        };
        let response = self
            .household
            .under_aware
            .agent_mut()
            .respond_to_suggestion(template.title);
        let assignee = if response.accepted {
            MemberKey::UnderAwareAdult
        } else {
            MemberKey::OverloadedAdult
        };
        tracing::debug!(
            task = template.title,
            accepted = response.accepted,
            response = %response.response,
            "Suggestion answered"
        );
        let agent = Some(self.household.member(assignee).agent().agent_ref());
        let at = self.clock.timestamp(TimeBlock::Day, self.rng.gen_range(0..360));
        self.record(
            at,
            agent,
            ActivityRecord::Task {
                title: template.title.to_string(),
                category: template.category,
                assignee,
                source: TaskSource::Suggestion,
            },
        );
    }

    async fn run_decision(
        &mut self,
        key: MemberKey,
        block: TimeBlock,
        situation: &str,
        candidates: &[&str],
    ) {
        let at = self.clock.timestamp(block, 30);
        let context = DecisionContext::new(
            format!("{situation} on {} ({} phase)", self.clock.weekday(), self.clock.phase()),
            candidates,
            at,
        );
        let decision = self
            .household
            .member_mut(key)
            .agent_mut()
            .decide_next_action(&context)
            .await;
        self.apply_decision(key, block, at, decision);
    }

    fn apply_decision(
        &mut self,
        key: MemberKey,
        block: TimeBlock,
        at: NaiveDateTime,
        decision: Decision,
    ) {
        let day = self.clock.day_number();
        if decision.fallback {
            self.observer
                .record_event(&ObserverEvent::DecisionFallback { day, member: key });
        }
        let member = self.household.member(key);
        let agent = Some(member.agent().agent_ref());
        let role = member.agent().role();
        let options = member.typical_tasks(self.clock.phase());

        let follow_up = match decision.action.as_str() {
            activities::CREATE_TASK if !options.is_empty() => {
                let template = options[self.rng.gen_range(0..options.len())];
                Some(ActivityRecord::Task {
                    title: template.title.to_string(),
                    category: template.category,
                    assignee: key,
                    source: TaskSource::Decision,
                })
            }
            activities::SCHEDULE_EVENT => Some(ActivityRecord::CalendarEvent {
                title: activities::calendar_title(role, &mut self.rng).to_string(),
                activity: crate::agent::ActivityKind::Chore,
                start: self.clock.timestamp(block, 60),
                duration_minutes: 30,
                attendees: vec![key],
            }),
            _ => None,
        };

        self.record(
            at,
            agent.clone(),
            ActivityRecord::Decision {
                member: key,
                action: decision.action,
                rationale: decision.rationale,
                urgency: decision.urgency.as_str().to_string(),
                fallback: decision.fallback,
            },
        );
        if let Some(payload) = follow_up {
            self.record(at, agent, payload);
        }
    }

    fn run_question(&mut self) {
        let Some(question) = self.household.middle.ask_question() else {
            return;
        };
        let agent = Some(self.household.middle.agent().agent_ref());
        let at = self.clock.timestamp(TimeBlock::Evening, 45);
        self.record(
            at,
            agent,
            ActivityRecord::Question {
                asked_by: MemberKey::MiddleChild,
                topic: question.topic,
                question: question.question,
                follow_ups: question.follow_ups,
            },
        );
    }

    /// Routine tasks and calendar entries for every member.
    fn run_routines(&mut self, block: TimeBlock) {
        let phase = self.clock.phase();
        let weekend = self.clock.is_weekend();
        let mut pending: Vec<Pending> = Vec::new();
        for member in self.household.members() {
            let key = member.agent().key();
            let agent = Some(member.agent().agent_ref());

            if self
                .rng
                .gen_bool(activities::task_probability(member, block, phase, weekend))
            {
                let options = member.typical_tasks(phase);
                if !options.is_empty() {
                    let template = options[self.rng.gen_range(0..options.len())];
                    let at = self
                        .clock
                        .timestamp(block, self.rng.gen_range(0..block.duration_minutes()));
                    pending.push((
                        at,
                        agent.clone(),
                        ActivityRecord::Task {
                            title: template.title.to_string(),
                            category: template.category,
                            assignee: key,
                            source: TaskSource::Routine,
                        },
                    ));
                }
            }

            if self
                .rng
                .gen_bool(activities::calendar_probability(member, block, phase, weekend))
            {
                let offset = self.rng.gen_range(0..block.duration_minutes());
                let start = self.clock.timestamp(block, offset);
                pending.push((
                    start,
                    agent,
                    ActivityRecord::CalendarEvent {
                        title: activities::calendar_title(member.agent().role(), &mut self.rng)
                            .to_string(),
                        activity: crate::agent::ActivityKind::Social,
                        start,
                        duration_minutes: 60,
                        attendees: vec![key],
                    },
                ));
            }
        }
        self.record_all(pending);
    }

    fn run_documents(&mut self) {
        let phase = self.clock.phase();
        let mut pending: Vec<Pending> = Vec::new();
        for key in [MemberKey::UnderAwareAdult, MemberKey::OverloadedAdult] {
            let member = self.household.member(key);
            if self.rng.gen_bool(activities::document_probability(member, phase)) {
                let at = self.clock.timestamp(TimeBlock::Day, self.rng.gen_range(0..360));
                pending.push((
                    at,
                    Some(member.agent().agent_ref()),
                    ActivityRecord::Document {
                        title: activities::document_title(&mut self.rng).to_string(),
                        uploaded_by: key,
                    },
                ));
            }
        }
        self.record_all(pending);
    }

    fn run_messages(&mut self) {
        for (index, contact) in CONTACT_ROSTER.iter().enumerate() {
            if !self.rng.gen_bool(DAILY_MESSAGE_PROBABILITY) {
                continue;
            }
            let at = self.clock.timestamp(TimeBlock::Day, self.rng.gen_range(0..360));
            if self.contacts.introduce(index) {
                self.record(
                    at,
                    None,
                    ActivityRecord::Contact {
                        name: contact.name.to_string(),
                        organization: contact.organization.to_string(),
                        channel: contact.channel,
                    },
                );
            }
            let subject = contact.pick_subject(&mut self.rng);
            self.record(
                at,
                None,
                ActivityRecord::InboundMessage {
                    contact: contact.name.to_string(),
                    channel: contact.channel,
                    subject: subject.to_string(),
                },
            );
        }
    }

    /// Announce newly active habits and draw today's completions.
    fn run_habits(&mut self) {
        let phase = self.clock.phase();
        let date = self.clock.date();
        let mut pending: Vec<Pending> = Vec::new();
        for member in self.household.members_mut() {
            let key = member.agent().key();
            let agent = Some(member.agent().agent_ref());
            let probability = habit_completion_probability(member.base_responsibility(), phase);
            for habit in member.agent_mut().habits_mut() {
                if !habit.is_active(phase) {
                    continue;
                }
                let (hour, minute) = habit.window_start;
                let at = self.clock.at(hour, minute);
                if !habit.announced {
                    habit.announced = true;
                    pending.push((
                        at,
                        agent.clone(),
                        ActivityRecord::Habit {
                            title: habit.title.clone(),
                            owner: key,
                            schedule: habit.schedule,
                            duration_minutes: habit.duration_minutes,
                        },
                    ));
                }
                if !habit.schedule.is_due(date) {
                    continue;
                }
                let completed = self.rng.gen_bool(unit(probability));
                habit.record(completed);
                if completed {
                    pending.push((
                        at,
                        agent.clone(),
                        ActivityRecord::HabitCompletion {
                            title: habit.title.clone(),
                            owner: key,
                            probability,
                        },
                    ));
                }
            }
        }
        self.record_all(pending);
    }

    /// Append to the log, bump the matching counter, and hand a copy to the
    /// sink. The three always happen together.
    fn record(&mut self, at: NaiveDateTime, agent: Option<AgentRef>, payload: ActivityRecord) {
        let entry = self.log.append(
            at,
            self.clock.day_number(),
            self.clock.phase(),
            agent,
            payload,
        );
        self.counters.increment(entry.kind);
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.dispatch(Record::Activity(entry.clone()));
        }
    }

    fn record_all(&mut self, pending: Vec<Pending>) {
        for (at, agent, payload) in pending {
            self.record(at, agent, payload);
        }
    }

    fn snapshot(&self, day: u32, final_update: bool) -> FamilySnapshot {
        let date = self
            .config
            .start_date
            .checked_add_days(chrono::Days::new(u64::from(day.saturating_sub(1))))
            .unwrap_or(self.clock.date());
        FamilySnapshot {
            run_id: self.run_id,
            day,
            date,
            phase: self.clock.phase(),
            final_update,
            counters: self.counters,
            members: self.agent_metrics(),
            task_distribution: self.task_distribution(),
        }
    }

    fn dispatch_snapshot(&mut self, day: u32, final_update: bool) {
        if self.dispatcher.is_none() {
            return;
        }
        let snapshot = self.snapshot(day, final_update);
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.dispatch(Record::FamilySnapshot(snapshot));
        }
    }

    /// Join the day's writes. Failures are already logged by the dispatcher.
    async fn checkpoint(&mut self, day: u32) {
        let Some(dispatcher) = self.dispatcher.as_mut() else {
            return;
        };
        self.observer
            .record_metric(&ObserverMetric::SinkBacklog(dispatcher.pending() as u64));
        let failures = dispatcher.checkpoint().await;
        if failures > 0 {
            self.observer
                .record_event(&ObserverEvent::SinkWritesFailed { day, failures });
        }
    }

    fn agent_metrics(&self) -> Vec<crate::agent::AgentMetrics> {
        self.household.members().iter().map(|m| m.metrics()).collect()
    }

    fn task_distribution(&self) -> std::collections::BTreeMap<MemberKey, f64> {
        task_distribution(self.log.entries().iter().filter_map(|e| match &e.payload {
            ActivityRecord::Task { assignee, .. } => Some(*assignee),
            _ => None,
        }))
    }

    fn result(&self, days_completed: u32, cancelled: bool, sink: SinkStats) -> RunResult {
        RunResult {
            run_id: self.run_id,
            seed: self.config.seed,
            start_date: self.config.start_date,
            days_completed,
            cancelled,
            final_phase: self.clock.phase(),
            phase_history: self.clock.phase_history().to_vec(),
            counters: self.counters,
            event_sample: self.log.sample(self.config.event_sample_size),
            agents: self.agent_metrics(),
            task_distribution: self.task_distribution(),
            perception_gap: self.config.perception_gap.gap(self.clock.phase()),
            sink,
        }
    }
}
