//! The persona agent core shared by every household member.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::agent::identity::{AgentRef, Identity, MemberKey, Role};
use crate::agent::profile::{AgentState, BehaviorPattern, Effect, Mood, Personality, apply_effect};
use crate::agent::tasks::{Habit, TaskTemplate};
use crate::decision::{
    DecisionBackend, DecisionRequest, PersonaSnapshot, RuleBasedBackend, Urgency, rules,
};
use crate::sim::Phase;
use crate::util::{mix_seed, unit};

/// Default bound on a single backend call made by an agent.
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(5);

const ENERGY_DECAY_PER_MINUTE: f64 = 0.0008;
const ENERGY_RECOVERY_PER_MINUTE: f64 = 0.0015;
const STRESS_JITTER: f64 = 0.05;
const MINUTES_PER_DAY: u32 = 24 * 60;
const WAKE_MINUTE: u32 = 6 * 60;
const SLEEP_MINUTE: u32 = 22 * 60;

/// Situation handed to [`PersonaAgent::decide_next_action`].
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub situation: String,
    pub candidates: Vec<String>,
    pub at: NaiveDateTime,
}

impl DecisionContext {
    pub fn new(situation: impl Into<String>, candidates: &[&str], at: NaiveDateTime) -> Self {
        Self {
            situation: situation.into(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            at,
        }
    }
}

/// The outcome of one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: String,
    pub rationale: String,
    pub says: String,
    pub urgency: Urgency,
    /// True when the agent had to use the local rule itself.
    pub fallback: bool,
}

/// One entry in an agent's decision history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub at: NaiveDateTime,
    pub situation: String,
    pub action: String,
    pub mood: Mood,
    pub stress: f64,
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Brief,
    Medium,
    Detailed,
}

impl Verbosity {
    pub fn from_level(level: f64) -> Self {
        if level < 0.34 {
            Verbosity::Brief
        } else if level < 0.67 {
            Verbosity::Medium
        } else {
            Verbosity::Detailed
        }
    }
}

const ACCEPT_PHRASES: [(Verbosity, &[&str]); 3] = [
    (Verbosity::Brief, &["Sure.", "OK, got it.", "Fine."]),
    (
        Verbosity::Medium,
        &[
            "Sure, I can take care of that.",
            "Good idea, I'll add it to my list.",
        ],
    ),
    (
        Verbosity::Detailed,
        &[
            "That makes sense. I'll handle it and put it on the family calendar so we both see it.",
            "Thanks for flagging it. I'll take it on this week and let you know when it's done.",
        ],
    ),
];

const DECLINE_PHRASES: [(Verbosity, &[&str]); 3] = [
    (Verbosity::Brief, &["Not now.", "Can't.", "Maybe later."]),
    (
        Verbosity::Medium,
        &[
            "I don't think I can fit that in today.",
            "Can we look at that another time?",
        ],
    ),
    (
        Verbosity::Detailed,
        &[
            "I'd like to help, but my week is already full. Could we revisit it at the next family meeting?",
            "I'm not sure that's the priority right now. Let's talk through what else is on the list first.",
        ],
    ),
];

fn phrases(accepted: bool, verbosity: Verbosity) -> &'static [&'static str] {
    let table = if accepted {
        &ACCEPT_PHRASES
    } else {
        &DECLINE_PHRASES
    };
    table
        .iter()
        .find(|(v, _)| *v == verbosity)
        .map(|(_, p)| *p)
        .unwrap_or(&[])
}

/// Reply to a suggestion from another member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub accepted: bool,
    pub confidence: f64,
    pub rationale: String,
    pub response: String,
}

/// End-of-run metrics for one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub key: MemberKey,
    pub name: String,
    pub role: Role,
    pub phase: Phase,
    pub mood: Mood,
    pub energy: f64,
    pub stress: f64,
    pub mental_load: f64,
    pub awareness: f64,
    pub decisions: usize,
    pub habit_completion_rate: Option<f64>,
    /// Variant-specific values such as skepticism or sleep quality.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
}

/// A simulated household member: traits, behaviour, state and the strategy
/// used to make decisions.
pub struct PersonaAgent {
    key: MemberKey,
    identity: Identity,
    personality: Personality,
    behavior: BehaviorPattern,
    state: AgentState,
    phase: Phase,
    minute_of_day: u32,
    habits: Vec<Habit>,
    history: Vec<DecisionRecord>,
    rng: StdRng,
    backend: Arc<dyn DecisionBackend>,
    decision_timeout: Duration,
}

impl std::fmt::Debug for PersonaAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonaAgent")
            .field("key", &self.key)
            .field("name", &self.identity.name)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

impl PersonaAgent {
    /// Create an agent. Every scalar is clamped into `[0, 1]`.
    ///
    /// The agent's random stream is derived from `seed` and its slot, so two
    /// members never share a sequence.
    pub fn new(
        key: MemberKey,
        identity: Identity,
        personality: Personality,
        behavior: BehaviorPattern,
        state: AgentState,
        seed: u64,
    ) -> Self {
        let mut agent = Self {
            key,
            identity,
            personality,
            behavior,
            state,
            phase: Phase::Chaos,
            minute_of_day: WAKE_MINUTE,
            habits: Vec::new(),
            history: Vec::new(),
            rng: StdRng::seed_from_u64(mix_seed(seed, key.index() as u64 + 1)),
            backend: Arc::new(RuleBasedBackend::new()),
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
        };
        agent.clamp_all();
        agent
    }

    fn clamp_all(&mut self) {
        let p = &mut self.personality;
        for v in [
            &mut p.helpfulness,
            &mut p.awareness,
            &mut p.follow_through,
            &mut p.initiative,
            &mut p.detail_orientation,
        ] {
            *v = unit(*v);
        }
        p.curiosity = p.curiosity.map(unit);
        p.independence = p.independence.map(unit);

        let b = &mut self.behavior;
        for v in [
            &mut b.task_creation_rate,
            &mut b.calendar_check_cadence,
            &mut b.survey_completion_rate,
            &mut b.document_upload_likelihood,
            &mut b.response_verbosity,
        ] {
            *v = unit(*v);
        }

        let s = &mut self.state;
        s.energy = unit(s.energy);
        s.stress = unit(s.stress);
        s.mental_load = unit(s.mental_load);
        s.mood = Mood::from_stress(s.stress);
    }

    /// Swap the decision strategy and its per-call bound.
    pub fn set_backend(&mut self, backend: Arc<dyn DecisionBackend>, timeout: Duration) {
        self.backend = backend;
        self.decision_timeout = timeout;
    }

    pub fn with_habit(mut self, habit: Habit) -> Self {
        self.habits.push(habit);
        self
    }

    pub fn key(&self) -> MemberKey {
        self.key
    }

    pub fn role(&self) -> Role {
        self.key.role()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn agent_ref(&self) -> AgentRef {
        AgentRef {
            key: self.key,
            external_id: self.identity.external_id.clone(),
        }
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    pub fn behavior(&self) -> &BehaviorPattern {
        &self.behavior
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn minute_of_day(&self) -> u32 {
        self.minute_of_day
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn habits_mut(&mut self) -> &mut [Habit] {
        &mut self.habits
    }

    pub fn history(&self) -> &[DecisionRecord] {
        &self.history
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Apply one phase effect, returning the field's new value.
    pub fn apply(&mut self, effect: Effect) -> f64 {
        apply_effect(
            effect,
            &mut self.personality,
            &mut self.behavior,
            &mut self.state,
        )
    }

    /// Record that the agent is now in `phase`. Only forward moves count.
    pub(crate) fn enter_phase(&mut self, phase: Phase) -> bool {
        if phase <= self.phase {
            return false;
        }
        self.phase = phase;
        true
    }

    /// Advance the agent's internal clock by `elapsed_minutes`.
    ///
    /// Energy decays while awake (06:00 to 22:00) and recovers otherwise,
    /// judged by the hour at the start of the interval. Stress follows mental
    /// load with a small symmetric jitter; mood follows stress.
    pub fn tick(&mut self, elapsed_minutes: u32) {
        let minutes = f64::from(elapsed_minutes);
        let awake = (WAKE_MINUTE..SLEEP_MINUTE).contains(&self.minute_of_day);
        self.state.energy = if awake {
            unit(self.state.energy - ENERGY_DECAY_PER_MINUTE * minutes)
        } else {
            unit(self.state.energy + ENERGY_RECOVERY_PER_MINUTE * minutes)
        };
        self.minute_of_day =
            (self.minute_of_day + elapsed_minutes % MINUTES_PER_DAY) % MINUTES_PER_DAY;

        let jitter = self.rng.gen_range(-STRESS_JITTER..=STRESS_JITTER);
        self.state.stress = unit(0.7 * self.state.mental_load + jitter);
        self.state.mood = Mood::from_stress(self.state.stress);
    }

    pub fn snapshot(&self) -> PersonaSnapshot {
        PersonaSnapshot {
            name: self.identity.name.clone(),
            role: self.role(),
            phase: self.phase,
            personality: self.personality.clone(),
            behavior: self.behavior.clone(),
            mood: self.state.mood,
            energy: self.state.energy,
            stress: self.state.stress,
            mental_load: self.state.mental_load,
        }
    }

    /// Choose an action for `context`.
    ///
    /// Never fails: a backend error, timeout or an answer outside the offered
    /// actions is replaced by the local rule. Each call appends exactly one
    /// history entry.
    pub async fn decide_next_action(&mut self, context: &DecisionContext) -> Decision {
        let request = DecisionRequest {
            persona: self.snapshot(),
            situation: context.situation.clone(),
            candidates: context.candidates.clone(),
            role_default: self.role().default_action().to_string(),
            seed: self.rng.next_u64(),
        };

        let backend = Arc::clone(&self.backend);
        let outcome = tokio::time::timeout(self.decision_timeout, backend.propose(&request)).await;
        let (proposal, fallback) = match outcome {
            Ok(Ok(proposal)) if request.accepts(&proposal.action) => (proposal, false),
            Ok(Ok(proposal)) => {
                tracing::warn!(
                    member = %self.key,
                    backend = %backend.name(),
                    action = %proposal.action,
                    "Backend proposed an action outside the candidates, using local rule"
                );
                (rules::decide(&request), true)
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    member = %self.key,
                    backend = %backend.name(),
                    error = %err,
                    "Decision backend failed, using local rule"
                );
                (rules::decide(&request), true)
            }
            Err(_) => {
                tracing::warn!(
                    member = %self.key,
                    backend = %backend.name(),
                    timeout = ?self.decision_timeout,
                    "Decision backend timed out, using local rule"
                );
                (rules::decide(&request), true)
            }
        };

        self.history.push(DecisionRecord {
            at: context.at,
            situation: context.situation.clone(),
            action: proposal.action.clone(),
            mood: self.state.mood,
            stress: self.state.stress,
            fallback,
        });
        self.state.last_action = Some(proposal.action.clone());

        Decision {
            action: proposal.action,
            rationale: proposal.rationale,
            says: proposal.says,
            urgency: proposal.urgency,
            fallback,
        }
    }

    /// `helpfulness/2 + awareness/2 - 0.3 * stress`, floored at 0.1.
    pub fn acceptance_probability(&self) -> f64 {
        let p = self.personality.helpfulness * 0.5 + self.personality.awareness * 0.5
            - self.state.stress * 0.3;
        unit(p.max(0.1))
    }

    /// React to a suggestion from another member.
    pub fn respond_to_suggestion(&mut self, suggestion: &str) -> SuggestionResponse {
        let probability = self.acceptance_probability();
        let accepted = self.rng.gen_bool(probability);
        let verbosity = Verbosity::from_level(self.behavior.response_verbosity);
        let options = phrases(accepted, verbosity);
        let response = if options.is_empty() {
            String::new()
        } else {
            options[self.rng.gen_range(0..options.len())].to_string()
        };

        SuggestionResponse {
            accepted,
            confidence: if accepted { probability } else { 1.0 - probability },
            rationale: format!(
                "{} '{}' (acceptance {:.2}, stress {:.2})",
                if accepted { "Accepted" } else { "Declined" },
                suggestion,
                probability,
                self.state.stress
            ),
            response,
        }
    }

    /// Completion rate across all habits, `None` before any attempt.
    pub fn habit_completion_rate(&self) -> Option<f64> {
        let (done, tried) = self
            .habits
            .iter()
            .fold((0u32, 0u32), |(d, t), h| (d + h.completions, t + h.attempts));
        (tried > 0).then(|| f64::from(done) / f64::from(tried))
    }

    pub fn metrics(&self) -> AgentMetrics {
        AgentMetrics {
            key: self.key,
            name: self.identity.name.clone(),
            role: self.role(),
            phase: self.phase,
            mood: self.state.mood,
            energy: self.state.energy,
            stress: self.state.stress,
            mental_load: self.state.mental_load,
            awareness: self.personality.awareness,
            decisions: self.history.len(),
            habit_completion_rate: self.habit_completion_rate(),
            extra: BTreeMap::new(),
        }
    }
}

/// Behaviour shared by every household member variant.
pub trait Persona: Send {
    fn agent(&self) -> &PersonaAgent;

    fn agent_mut(&mut self) -> &mut PersonaAgent;

    /// Short label for the variant.
    fn archetype(&self) -> &'static str;

    /// Declarative effects applied on entering `phase`.
    fn phase_effects(&self, phase: Phase) -> &'static [Effect];

    /// Hook for variant state that lives outside the shared vectors.
    fn on_phase_entered(&mut self, _phase: Phase) {}

    /// Move to `phase`, applying its effects once.
    ///
    /// Returns false without touching anything when `phase` is not strictly
    /// after the current one, so repeated calls are harmless.
    fn advance_phase(&mut self, phase: Phase) -> bool {
        if !self.agent_mut().enter_phase(phase) {
            return false;
        }
        for effect in self.phase_effects(phase) {
            self.agent_mut().apply(*effect);
        }
        self.on_phase_entered(phase);
        tracing::debug!(member = %self.agent().key(), phase = %phase, "Applied phase effects");
        true
    }

    /// Tasks this member would consider during `phase`.
    fn typical_tasks(&self, phase: Phase) -> Vec<TaskTemplate>;

    /// Base probability of completing a habit, before the phase bonus.
    fn base_responsibility(&self) -> f64 {
        self.agent().personality().follow_through
    }

    fn metrics(&self) -> AgentMetrics {
        self.agent().metrics()
    }
}

/// The bare agent has no phase arc.
impl Persona for PersonaAgent {
    fn agent(&self) -> &PersonaAgent {
        self
    }

    fn agent_mut(&mut self) -> &mut PersonaAgent {
        self
    }

    fn archetype(&self) -> &'static str {
        "base"
    }

    fn phase_effects(&self, _phase: Phase) -> &'static [Effect] {
        &[]
    }

    fn typical_tasks(&self, _phase: Phase) -> Vec<TaskTemplate> {
        Vec::new()
    }
}
