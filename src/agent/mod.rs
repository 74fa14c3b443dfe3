//! Persona agents: the five simulated household members.
//!
//! Every member wraps a [`PersonaAgent`] core (traits, behaviour, state,
//! decision history) and implements [`Persona`] to supply its phase-effect
//! table, task templates and variant-specific metrics.

mod adult;
mod child;
mod household;
mod identity;
mod persona;
mod profile;
mod tasks;

pub use adult::{OverloadedAdult, UnderAwareAdult};
pub use child::{
    Activity, ActivityKind, AgeTraits, ChildAgent, ChildKind, ChildQuestion, MAX_BOREDOM,
};
pub use household::{Household, HouseholdBuilder};
pub use identity::{AgentRef, Identity, IdentityMap, MemberKey, Role};
pub use persona::{
    AgentMetrics, DEFAULT_DECISION_TIMEOUT, Decision, DecisionContext, DecisionRecord, Persona,
    PersonaAgent, SuggestionResponse, Verbosity,
};
pub use profile::{Adjustment, AgentState, BehaviorPattern, Effect, Field, Mood, Personality};
pub use tasks::{Habit, HabitSchedule, TaskCategory, TaskTemplate, available_tasks};
