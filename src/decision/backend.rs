//! Decision backend trait and request/response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::{BehaviorPattern, Mood, Personality, Role};
use crate::error::BackendError;
use crate::sim::Phase;

/// Read-only copy of the persona fields a backend may reason about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSnapshot {
    pub name: String,
    pub role: Role,
    pub phase: Phase,
    pub personality: Personality,
    pub behavior: BehaviorPattern,
    pub mood: Mood,
    pub energy: f64,
    pub stress: f64,
    pub mental_load: f64,
}

/// A "what would this person do now" question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub persona: PersonaSnapshot,
    pub situation: String,
    pub candidates: Vec<String>,
    /// The no-op this persona falls back to when too stressed to act.
    pub role_default: String,
    /// Seed for reproducible local decisions.
    pub seed: u64,
}

impl DecisionRequest {
    /// Whether `action` is one this request allows.
    pub fn accepts(&self, action: &str) -> bool {
        action == self.role_default || self.candidates.iter().any(|c| c == action)
    }

    /// Render the request as a prompt for a text-completion backend.
    pub fn to_prompt(&self) -> String {
        let persona = serde_json::to_string(&self.persona).unwrap_or_default();
        let mut prompt = format!(
            "You are simulating a family member. Persona: {persona}\n\
             Situation: {}\n\
             Choose exactly one action from this list: {}.\n\
             If they are too overwhelmed to act, choose \"{}\".\n",
            self.situation,
            self.candidates.join(", "),
            self.role_default,
        );
        prompt.push_str(
            "Reply with a single JSON object: \
             {\"action\": string, \"rationale\": string, \"says\": string, \
             \"urgency\": \"low\" | \"normal\" | \"high\"}",
        );
        prompt
    }
}

/// How pressing the chosen action feels to the persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::High => "high",
        }
    }
}

/// A backend's answer. Every implementation returns this same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub action: String,
    pub rationale: String,
    /// What the persona would say out loud.
    #[serde(default)]
    pub says: String,
    #[serde(default)]
    pub urgency: Urgency,
}

/// Strategy a persona agent delegates to when choosing an action.
#[async_trait]
pub trait DecisionBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Propose an action for the request.
    async fn propose(&self, request: &DecisionRequest) -> Result<Proposal, BackendError>;
}
