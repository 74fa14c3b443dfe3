//! The two adult archetypes and their opposite transformation arcs.

use chrono::Weekday;
use rand::Rng;

use crate::agent::identity::{Identity, MemberKey};
use crate::agent::persona::{AgentMetrics, Persona, PersonaAgent};
use crate::agent::profile::{AgentState, BehaviorPattern, Effect, Field, Personality};
use crate::agent::tasks::{Habit, HabitSchedule, TaskCategory, TaskTemplate, available_tasks};
use crate::sim::Phase;
use crate::util::unit;

use Field::*;

const UNDER_AWARE_EFFECTS: [&[Effect]; 5] = [
    &[
        Effect::set(Awareness, 0.25),
        Effect::set(Initiative, 0.30),
        Effect::set(MentalLoad, 0.30),
    ],
    &[
        Effect::set(Awareness, 0.40),
        Effect::set(Initiative, 0.40),
        Effect::set(MentalLoad, 0.34),
        Effect::delta(CalendarCheckCadence, 0.10),
        Effect::delta(TaskCreationRate, 0.05),
        Effect::delta(SurveyCompletionRate, 0.05),
    ],
    &[
        Effect::set(Awareness, 0.55),
        Effect::set(Initiative, 0.50),
        Effect::set(MentalLoad, 0.38),
        Effect::delta(CalendarCheckCadence, 0.10),
        Effect::delta(TaskCreationRate, 0.05),
        Effect::delta(DocumentUploadLikelihood, 0.05),
    ],
    &[
        Effect::set(Awareness, 0.70),
        Effect::set(Initiative, 0.60),
        Effect::set(MentalLoad, 0.42),
        Effect::delta(CalendarCheckCadence, 0.10),
        Effect::delta(TaskCreationRate, 0.05),
        Effect::delta(SurveyCompletionRate, 0.05),
    ],
    &[
        Effect::set(Awareness, 0.80),
        Effect::set(Initiative, 0.70),
        Effect::set(MentalLoad, 0.45),
        Effect::delta(CalendarCheckCadence, 0.05),
        Effect::delta(TaskCreationRate, 0.05),
        Effect::delta(DocumentUploadLikelihood, 0.05),
    ],
];

const OVERLOADED_EFFECTS: [&[Effect]; 5] = [
    &[Effect::set(MentalLoad, 0.87), Effect::set(Stress, 0.61)],
    &[
        Effect::set(MentalLoad, 0.80),
        Effect::set(Stress, 0.56),
        Effect::delta(TaskCreationRate, -0.05),
    ],
    &[
        Effect::set(MentalLoad, 0.68),
        Effect::set(Stress, 0.48),
        Effect::delta(TaskCreationRate, -0.05),
        Effect::delta(SurveyCompletionRate, 0.02),
    ],
    &[
        Effect::set(MentalLoad, 0.55),
        Effect::set(Stress, 0.385),
        Effect::delta(TaskCreationRate, -0.05),
        Effect::delta(DocumentUploadLikelihood, -0.05),
    ],
    &[
        Effect::set(MentalLoad, 0.50),
        Effect::set(Stress, 0.35),
        Effect::delta(TaskCreationRate, -0.03),
    ],
];

const UNDER_AWARE_TASKS: [TaskTemplate; 10] = [
    TaskTemplate::always("Take out the trash", TaskCategory::Household),
    TaskTemplate::always("Mow the lawn", TaskCategory::Household),
    TaskTemplate::always("Grocery run", TaskCategory::Errands),
    TaskTemplate::always("School drop-off", TaskCategory::Childcare),
    TaskTemplate::gated(
        "Book dentist appointments",
        TaskCategory::Coordination,
        Phase::Integration,
    ),
    TaskTemplate::gated(
        "Coordinate carpool schedule",
        TaskCategory::Coordination,
        Phase::Integration,
    ),
    TaskTemplate::gated("Plan weekend activities", TaskCategory::Coordination, Phase::Integration),
    TaskTemplate::gated("Remember birthday gifts", TaskCategory::Invisible, Phase::Balanced),
    TaskTemplate::gated("Track school permission slips", TaskCategory::Invisible, Phase::Balanced),
    TaskTemplate::gated(
        "Anticipate seasonal clothing needs",
        TaskCategory::Invisible,
        Phase::Balanced,
    ),
];

const OVERLOADED_TASKS: [TaskTemplate; 10] = [
    TaskTemplate::always("Laundry", TaskCategory::Household),
    TaskTemplate::always("Meal planning and cooking", TaskCategory::Household),
    TaskTemplate::always("Pharmacy pickup", TaskCategory::Errands),
    TaskTemplate::always("Pediatrician follow-up", TaskCategory::Childcare),
    TaskTemplate::always("Review homework folders", TaskCategory::Schoolwork),
    TaskTemplate::always("Schedule parent-teacher conference", TaskCategory::Coordination),
    TaskTemplate::always("Arrange babysitter", TaskCategory::Coordination),
    TaskTemplate::always("Renew library cards", TaskCategory::Invisible),
    TaskTemplate::always("Refill school lunch accounts", TaskCategory::Invisible),
    TaskTemplate::always("Notice the kids have outgrown their shoes", TaskCategory::Invisible),
];

/// The adult who starts out unaware of most household coordination.
#[derive(Debug)]
pub struct UnderAwareAdult {
    agent: PersonaAgent,
    perceived_partner_load: f64,
}

impl UnderAwareAdult {
    pub fn new(identity: Identity, seed: u64) -> Self {
        let personality = Personality {
            helpfulness: 0.60,
            awareness: 0.25,
            follow_through: 0.50,
            initiative: 0.30,
            detail_orientation: 0.35,
            curiosity: None,
            independence: None,
        };
        let behavior = BehaviorPattern {
            task_creation_rate: 0.20,
            calendar_check_cadence: 0.20,
            survey_completion_rate: 0.50,
            document_upload_likelihood: 0.20,
            response_verbosity: 0.25,
        };
        let agent = PersonaAgent::new(
            MemberKey::UnderAwareAdult,
            identity,
            personality,
            behavior,
            AgentState::with_mental_load(0.30),
            seed,
        )
        .with_habit(
            Habit::new("Review family calendar", HabitSchedule::Daily, (20, 0), (20, 15), 10)
                .active_from(Phase::Discovery),
        );
        Self {
            agent,
            perceived_partner_load: 0.0,
        }
    }

    /// Update the belief about the partner's load, `actual - gap`.
    pub fn observe_partner(&mut self, partner_mental_load: f64, gap: f64) {
        self.perceived_partner_load = unit(partner_mental_load - gap);
    }

    pub fn perceived_partner_load(&self) -> f64 {
        self.perceived_partner_load
    }
}

impl Persona for UnderAwareAdult {
    fn agent(&self) -> &PersonaAgent {
        &self.agent
    }

    fn agent_mut(&mut self) -> &mut PersonaAgent {
        &mut self.agent
    }

    fn archetype(&self) -> &'static str {
        "under_aware_adult"
    }

    fn phase_effects(&self, phase: Phase) -> &'static [Effect] {
        UNDER_AWARE_EFFECTS[phase.index()]
    }

    fn typical_tasks(&self, phase: Phase) -> Vec<TaskTemplate> {
        available_tasks(&UNDER_AWARE_TASKS, phase)
    }

    fn metrics(&self) -> AgentMetrics {
        let mut metrics = self.agent.metrics();
        metrics
            .extra
            .insert("perceived_partner_load".to_string(), self.perceived_partner_load);
        metrics
    }
}

/// The adult carrying most of the household's mental load.
#[derive(Debug)]
pub struct OverloadedAdult {
    agent: PersonaAgent,
    suggestions_made: u32,
}

impl OverloadedAdult {
    pub fn new(identity: Identity, seed: u64) -> Self {
        let personality = Personality {
            helpfulness: 0.90,
            awareness: 0.95,
            follow_through: 0.85,
            initiative: 0.85,
            detail_orientation: 0.90,
            curiosity: None,
            independence: None,
        };
        let behavior = BehaviorPattern {
            task_creation_rate: 0.80,
            calendar_check_cadence: 0.90,
            survey_completion_rate: 0.85,
            document_upload_likelihood: 0.70,
            response_verbosity: 0.75,
        };
        let agent = PersonaAgent::new(
            MemberKey::OverloadedAdult,
            identity,
            personality,
            behavior,
            AgentState::with_mental_load(0.87),
            seed,
        )
        .with_habit(Habit::new(
            "Weekly planning",
            HabitSchedule::On(Weekday::Sun),
            (19, 0),
            (19, 45),
            30,
        ));
        Self {
            agent,
            suggestions_made: 0,
        }
    }

    /// Pick a task to hand over to the partner.
    pub fn suggest_task(&mut self) -> Option<TaskTemplate> {
        let phase = self.agent.phase();
        let options = self.typical_tasks(phase);
        if options.is_empty() {
            return None;
        }
        let pick = options[self.agent.rng().gen_range(0..options.len())];
        self.suggestions_made += 1;
        Some(pick)
    }

    pub fn suggestions_made(&self) -> u32 {
        self.suggestions_made
    }
}

impl Persona for OverloadedAdult {
    fn agent(&self) -> &PersonaAgent {
        &self.agent
    }

    fn agent_mut(&mut self) -> &mut PersonaAgent {
        &mut self.agent
    }

    fn archetype(&self) -> &'static str {
        "overloaded_adult"
    }

    fn phase_effects(&self, phase: Phase) -> &'static [Effect] {
        OVERLOADED_EFFECTS[phase.index()]
    }

    /// Sees every kind of work from the start.
    fn typical_tasks(&self, phase: Phase) -> Vec<TaskTemplate> {
        available_tasks(&OVERLOADED_TASKS, phase)
    }

    fn metrics(&self) -> AgentMetrics {
        let mut metrics = self.agent.metrics();
        metrics
            .extra
            .insert("suggestions_made".to_string(), f64::from(self.suggestions_made));
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::IdentityMap;

    fn identity(key: MemberKey) -> Identity {
        IdentityMap::generated(1).require(key).unwrap().clone()
    }

    #[test]
    fn overloaded_mental_load_hits_balanced_constant() {
        let mut adult = OverloadedAdult::new(identity(MemberKey::OverloadedAdult), 1);
        let initial = adult.agent().state().mental_load;
        assert!(adult.advance_phase(Phase::Balanced));
        assert_eq!(adult.agent().state().mental_load, 0.55);
        assert_eq!(adult.agent().state().stress, 0.385);
        assert!(adult.agent().state().mental_load < initial);
    }

    #[test]
    fn under_aware_awareness_rises() {
        let mut adult = UnderAwareAdult::new(identity(MemberKey::UnderAwareAdult), 1);
        let initial = adult.agent().personality().awareness;
        let mut last = initial;
        for phase in &Phase::ALL[1..] {
            adult.advance_phase(*phase);
            let now = adult.agent().personality().awareness;
            assert!(now > last, "{phase}: {now} <= {last}");
            last = now;
        }
        assert!(last > initial);
    }

    #[test]
    fn advance_phase_is_idempotent() {
        let mut adult = UnderAwareAdult::new(identity(MemberKey::UnderAwareAdult), 1);
        assert!(adult.advance_phase(Phase::Discovery));
        let once = adult.agent().behavior().clone();
        assert!(!adult.advance_phase(Phase::Discovery));
        assert!(!adult.advance_phase(Phase::Chaos));
        assert_eq!(adult.agent().behavior(), &once);
    }

    #[test]
    fn task_visibility_asymmetry() {
        let under = UnderAwareAdult::new(identity(MemberKey::UnderAwareAdult), 1);
        let over = OverloadedAdult::new(identity(MemberKey::OverloadedAdult), 1);

        let chaos = under.typical_tasks(Phase::Chaos);
        assert!(chaos.iter().all(|t| t.category.is_visible()));
        let integration = under.typical_tasks(Phase::Integration);
        assert!(integration.iter().any(|t| t.category == TaskCategory::Coordination));
        assert!(integration.iter().all(|t| t.category != TaskCategory::Invisible));
        let balanced = under.typical_tasks(Phase::Balanced);
        assert!(balanced.iter().any(|t| t.category == TaskCategory::Invisible));

        let over_chaos = over.typical_tasks(Phase::Chaos);
        assert!(over_chaos.iter().any(|t| t.category == TaskCategory::Invisible));
    }

    #[test]
    fn perceived_load_is_actual_minus_gap() {
        let mut adult = UnderAwareAdult::new(identity(MemberKey::UnderAwareAdult), 1);
        adult.observe_partner(0.87, 0.5);
        assert!((adult.perceived_partner_load() - 0.37).abs() < 1e-12);
        adult.observe_partner(0.1, 0.5);
        assert_eq!(adult.perceived_partner_load(), 0.0);
        assert!(adult.metrics().extra.contains_key("perceived_partner_load"));
    }

    #[test]
    fn suggestions_come_from_typical_tasks() {
        let mut adult = OverloadedAdult::new(identity(MemberKey::OverloadedAdult), 1);
        let task = adult.suggest_task().unwrap();
        assert!(adult.typical_tasks(Phase::Chaos).contains(&task));
        assert_eq!(adult.suggestions_made(), 1);
    }
}
