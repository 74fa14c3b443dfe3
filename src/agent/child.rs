//! Child agents: age-derived traits, weekly activities, boredom and the
//! per-child quirks (skepticism, questions, bedtime routine).

use chrono::Weekday;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::identity::{Identity, MemberKey};
use crate::agent::persona::{AgentMetrics, Persona, PersonaAgent};
use crate::agent::profile::{AgentState, BehaviorPattern, Effect, Field, Personality};
use crate::agent::tasks::{Habit, HabitSchedule, TaskCategory, TaskTemplate, available_tasks};
use crate::sim::{Phase, TimeBlock};
use crate::util::unit;

/// Upper bound of the boredom scale.
pub const MAX_BOREDOM: f64 = 10.0;

const BASE_SLEEP_QUALITY: f64 = 0.6;
const ROUTINE_SLEEP_FACTOR: f64 = 1.25;

/// Oldest child's trust gap toward the family coordination system, per phase.
const SKEPTICISM_BY_PHASE: [f64; 5] = [0.90, 0.70, 0.45, 0.20, 0.05];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildKind {
    Oldest,
    Middle,
    Youngest,
}

impl ChildKind {
    pub fn key(self) -> MemberKey {
        match self {
            ChildKind::Oldest => MemberKey::OldestChild,
            ChildKind::Middle => MemberKey::MiddleChild,
            ChildKind::Youngest => MemberKey::YoungestChild,
        }
    }

    pub fn default_age(self) -> u8 {
        match self {
            ChildKind::Oldest => 14,
            ChildKind::Middle => 11,
            ChildKind::Youngest => 7,
        }
    }
}

/// What kind of scheduled activity something is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Sport,
    Academic,
    Social,
    Chore,
}

/// A recurring weekly activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub kind: ActivityKind,
    pub days: Vec<Weekday>,
    pub block: TimeBlock,
    pub duration_minutes: u32,
}

impl Activity {
    fn new(
        name: &str,
        kind: ActivityKind,
        days: &[Weekday],
        block: TimeBlock,
        duration_minutes: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            days: days.to_vec(),
            block,
            duration_minutes,
        }
    }

    pub fn occurs(&self, weekday: Weekday, block: TimeBlock) -> bool {
        self.block == block && self.days.contains(&weekday)
    }
}

/// Traits that follow directly from a child's age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeTraits {
    pub responsibility: f64,
    pub initiative: f64,
    pub attention_span_minutes: u32,
    pub boredom_threshold: f64,
}

impl AgeTraits {
    pub fn for_age(age: u8) -> Self {
        let years = f64::from(age);
        Self {
            responsibility: (0.2 + 0.06 * (years - 4.0)).clamp(0.1, 0.9),
            initiative: (0.05 * years).clamp(0.0, 1.0),
            attention_span_minutes: u32::from(age) * 3,
            boredom_threshold: (years / 2.0).min(MAX_BOREDOM),
        }
    }
}

/// A question a curious child asks, with its follow-ups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildQuestion {
    pub topic: String,
    pub question: String,
    pub follow_ups: Vec<String>,
}

const QUESTION_BANK: [(&str, &str, [&str; 2]); 6] = [
    (
        "space",
        "Why is the sky dark at night if there are so many stars?",
        ["How far away is the closest star?", "Do other planets have night too?"],
    ),
    (
        "animals",
        "How do cats see in the dark?",
        ["Can dogs see colors?", "Which animal has the best eyes?"],
    ),
    (
        "weather",
        "Where does thunder come from?",
        [
            "Why do we see lightning before we hear thunder?",
            "Can lightning strike the same place twice?",
        ],
    ),
    (
        "body",
        "Why do we need to sleep?",
        ["What happens in your brain when you dream?", "Do fish sleep?"],
    ),
    (
        "chemistry",
        "Why does baking soda fizz with vinegar?",
        ["What gas comes out?", "Could we make the volcano bigger?"],
    ),
    (
        "ocean",
        "Why is the ocean salty?",
        ["Are rivers salty too?", "How deep is the deepest part?"],
    ),
];

use Field::*;

const OLDEST_EFFECTS: [&[Effect]; 5] = [
    &[],
    &[Effect::delta(FollowThrough, 0.03), Effect::delta(CalendarCheckCadence, 0.05)],
    &[
        Effect::delta(FollowThrough, 0.03),
        Effect::delta(CalendarCheckCadence, 0.05),
        Effect::delta(TaskCreationRate, 0.03),
    ],
    &[
        Effect::delta(FollowThrough, 0.03),
        Effect::delta(CalendarCheckCadence, 0.05),
        Effect::delta(Independence, 0.05),
    ],
    &[Effect::delta(FollowThrough, 0.02), Effect::delta(Independence, 0.05)],
];

const MIDDLE_EFFECTS: [&[Effect]; 5] = [
    &[Effect::set(Curiosity, 0.90)],
    &[Effect::set(Curiosity, 0.90), Effect::delta(DetailOrientation, 0.03)],
    &[Effect::set(Curiosity, 0.90), Effect::delta(DetailOrientation, 0.03)],
    &[Effect::set(Curiosity, 0.90), Effect::delta(DetailOrientation, 0.03)],
    &[Effect::set(Curiosity, 0.90), Effect::delta(DetailOrientation, 0.02)],
];

const YOUNGEST_EFFECTS: [&[Effect]; 5] = [
    &[],
    &[Effect::delta(FollowThrough, 0.04)],
    &[Effect::delta(FollowThrough, 0.04), Effect::delta(ResponseVerbosity, 0.02)],
    &[Effect::delta(FollowThrough, 0.04), Effect::delta(ResponseVerbosity, 0.02)],
    &[Effect::delta(FollowThrough, 0.03)],
];

const OLDEST_TASKS: [TaskTemplate; 5] = [
    TaskTemplate::always("Empty the dishwasher", TaskCategory::Household),
    TaskTemplate::always("Walk the dog", TaskCategory::Household),
    TaskTemplate::always("Finish homework", TaskCategory::Schoolwork),
    TaskTemplate::gated(
        "Update own activity calendar",
        TaskCategory::Coordination,
        Phase::Integration,
    ),
    TaskTemplate::gated("Remind siblings about chores", TaskCategory::Invisible, Phase::Balanced),
];

const MIDDLE_TASKS: [TaskTemplate; 4] = [
    TaskTemplate::always("Set the table", TaskCategory::Household),
    TaskTemplate::always("Practice spelling words", TaskCategory::Schoolwork),
    TaskTemplate::gated("Pack own swim bag", TaskCategory::Coordination, Phase::Integration),
    TaskTemplate::gated(
        "Notice the cat's water bowl is empty",
        TaskCategory::Invisible,
        Phase::Balanced,
    ),
];

const YOUNGEST_TASKS: [TaskTemplate; 3] = [
    TaskTemplate::always("Tidy up toys", TaskCategory::Household),
    TaskTemplate::always("Reading practice", TaskCategory::Schoolwork),
    TaskTemplate::gated(
        "Lay out clothes for tomorrow",
        TaskCategory::Coordination,
        Phase::Integration,
    ),
];

/// One of the three children.
#[derive(Debug)]
pub struct ChildAgent {
    agent: PersonaAgent,
    kind: ChildKind,
    age: u8,
    traits: AgeTraits,
    activities: Vec<Activity>,
    boredom: f64,
    boredom_episodes: u32,
    skepticism: f64,
    nightly_routine: bool,
    questions_asked: u32,
}

impl ChildAgent {
    /// Build a child. The identity's age wins over the slot default.
    pub fn new(kind: ChildKind, identity: Identity, seed: u64) -> Self {
        let age = identity.age.unwrap_or_else(|| kind.default_age());
        let traits = AgeTraits::for_age(age);
        let years = f64::from(age);

        let (helpfulness, curiosity, verbosity) = match kind {
            ChildKind::Oldest => (0.45, 0.50, 0.20),
            ChildKind::Middle => (0.60, 0.90, 0.60),
            ChildKind::Youngest => (0.70, 0.80, 0.50),
        };
        let personality = Personality {
            helpfulness,
            awareness: 0.2 + 0.03 * years,
            follow_through: traits.responsibility,
            initiative: traits.initiative,
            detail_orientation: 0.3 + 0.02 * years,
            curiosity: Some(curiosity),
            independence: Some(unit(years / 16.0)),
        };
        let behavior = BehaviorPattern {
            task_creation_rate: 0.10,
            calendar_check_cadence: 0.10 + 0.02 * years,
            survey_completion_rate: 0.0,
            document_upload_likelihood: 0.05,
            response_verbosity: verbosity,
        };
        let agent = PersonaAgent::new(
            kind.key(),
            identity,
            personality,
            behavior,
            AgentState::with_mental_load(0.1 + 0.01 * years),
            seed,
        )
        .with_habit(Self::chore(kind));

        Self {
            agent,
            kind,
            age,
            traits,
            activities: Self::schedule(kind),
            boredom: 0.0,
            boredom_episodes: 0,
            skepticism: SKEPTICISM_BY_PHASE[0],
            nightly_routine: false,
            questions_asked: 0,
        }
    }

    fn chore(kind: ChildKind) -> Habit {
        match kind {
            ChildKind::Oldest => Habit::new("Make bed", HabitSchedule::Daily, (7, 0), (7, 30), 5),
            ChildKind::Middle => Habit::new("Study", HabitSchedule::Weekdays, (16, 0), (17, 0), 30),
            ChildKind::Youngest => {
                Habit::new("Feed the cat", HabitSchedule::Weekdays, (17, 0), (17, 30), 10)
            }
        }
    }

    fn schedule(kind: ChildKind) -> Vec<Activity> {
        use ActivityKind::*;
        use TimeBlock::{Afternoon, Morning};
        use Weekday::*;
        match kind {
            ChildKind::Oldest => vec![
                Activity::new("Soccer practice", Sport, &[Tue, Thu], Afternoon, 90),
                Activity::new("Hanging out with friends", Social, &[Sat], Afternoon, 120),
            ],
            ChildKind::Middle => vec![
                Activity::new("Swim team", Sport, &[Mon, Wed], Afternoon, 60),
                Activity::new("Science club", Academic, &[Fri], Afternoon, 60),
            ],
            ChildKind::Youngest => vec![
                Activity::new("Dance class", Sport, &[Sat], Morning, 45),
                Activity::new("Library story time", Academic, &[Wed], Afternoon, 45),
            ],
        }
    }

    pub fn kind(&self) -> ChildKind {
        self.kind
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn traits(&self) -> &AgeTraits {
        &self.traits
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn activities_in(&self, weekday: Weekday, block: TimeBlock) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| a.occurs(weekday, block))
            .collect()
    }

    pub fn boredom(&self) -> f64 {
        self.boredom
    }

    /// Update boredom after a block.
    ///
    /// A scheduled activity halves it; an empty block adds
    /// `block_hours / age`. Returns true when the threshold is reached, in
    /// which case boredom resets to zero.
    pub fn accumulate_boredom(&mut self, block: TimeBlock, had_activity: bool) -> bool {
        if had_activity {
            self.boredom /= 2.0;
            return false;
        }
        let rate = block.hours() / f64::from(self.age.max(1));
        self.boredom = (self.boredom + rate).clamp(0.0, MAX_BOREDOM);
        if self.boredom >= self.traits.boredom_threshold {
            self.boredom = 0.0;
            self.boredom_episodes += 1;
            return true;
        }
        false
    }

    pub fn skepticism(&self) -> f64 {
        self.skepticism
    }

    pub fn nightly_routine(&self) -> bool {
        self.nightly_routine
    }

    /// Bedtime quality; better once a nightly routine is in place.
    pub fn sleep_quality(&self) -> f64 {
        if self.nightly_routine {
            unit(BASE_SLEEP_QUALITY * ROUTINE_SLEEP_FACTOR)
        } else {
            BASE_SLEEP_QUALITY
        }
    }

    /// Probability of asking a question on a given evening.
    pub fn question_probability(&self) -> f64 {
        unit(self.agent.personality().curiosity.unwrap_or(0.0) * 0.5)
    }

    /// Maybe ask a question. Only the middle child does; every question comes
    /// with exactly two follow-ups.
    pub fn ask_question(&mut self) -> Option<ChildQuestion> {
        if self.kind != ChildKind::Middle {
            return None;
        }
        let p = self.question_probability();
        let rng = self.agent.rng();
        if !rng.gen_bool(p) {
            return None;
        }
        let (topic, question, follow_ups) = QUESTION_BANK[rng.gen_range(0..QUESTION_BANK.len())];
        self.questions_asked += 1;
        Some(ChildQuestion {
            topic: topic.to_string(),
            question: question.to_string(),
            follow_ups: follow_ups.iter().map(|f| f.to_string()).collect(),
        })
    }

    pub fn questions_asked(&self) -> u32 {
        self.questions_asked
    }
}

impl Persona for ChildAgent {
    fn agent(&self) -> &PersonaAgent {
        &self.agent
    }

    fn agent_mut(&mut self) -> &mut PersonaAgent {
        &mut self.agent
    }

    fn archetype(&self) -> &'static str {
        match self.kind {
            ChildKind::Oldest => "oldest_child",
            ChildKind::Middle => "middle_child",
            ChildKind::Youngest => "youngest_child",
        }
    }

    fn phase_effects(&self, phase: Phase) -> &'static [Effect] {
        match self.kind {
            ChildKind::Oldest => OLDEST_EFFECTS[phase.index()],
            ChildKind::Middle => MIDDLE_EFFECTS[phase.index()],
            ChildKind::Youngest => YOUNGEST_EFFECTS[phase.index()],
        }
    }

    fn on_phase_entered(&mut self, phase: Phase) {
        match self.kind {
            ChildKind::Oldest => self.skepticism = SKEPTICISM_BY_PHASE[phase.index()],
            ChildKind::Youngest if phase >= Phase::Integration => self.nightly_routine = true,
            _ => {}
        }
    }

    fn typical_tasks(&self, phase: Phase) -> Vec<TaskTemplate> {
        let templates: &[TaskTemplate] = match self.kind {
            ChildKind::Oldest => &OLDEST_TASKS,
            ChildKind::Middle => &MIDDLE_TASKS,
            ChildKind::Youngest => &YOUNGEST_TASKS,
        };
        available_tasks(templates, phase)
    }

    fn base_responsibility(&self) -> f64 {
        self.traits.responsibility
    }

    fn metrics(&self) -> AgentMetrics {
        let mut metrics = self.agent.metrics();
        metrics.extra.insert("age".to_string(), f64::from(self.age));
        metrics.extra.insert("boredom".to_string(), self.boredom);
        metrics
            .extra
            .insert("boredom_episodes".to_string(), f64::from(self.boredom_episodes));
        match self.kind {
            ChildKind::Oldest => {
                metrics.extra.insert("skepticism".to_string(), self.skepticism);
            }
            ChildKind::Middle => {
                metrics
                    .extra
                    .insert("questions_asked".to_string(), f64::from(self.questions_asked));
            }
            ChildKind::Youngest => {
                metrics.extra.insert("sleep_quality".to_string(), self.sleep_quality());
            }
        }
        metrics
    }
}
