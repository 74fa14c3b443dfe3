//! Local, deterministic decision rule. Always succeeds.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::Personality;
use crate::decision::backend::{DecisionBackend, DecisionRequest, Proposal, Urgency};
use crate::error::BackendError;

/// Width of the seeded jitter that breaks ties between equally weighted
/// candidates.
const TIE_BREAK: f64 = 0.05;

/// Rule-based backend. Wraps [`decide`] so it can sit in a fallback chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedBackend;

impl RuleBasedBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DecisionBackend for RuleBasedBackend {
    fn name(&self) -> &str {
        "rules"
    }

    async fn propose(&self, request: &DecisionRequest) -> Result<Proposal, BackendError> {
        Ok(decide(request))
    }
}

/// Choose an action for `request` using only its own seed.
///
/// A draw below the persona's stress yields the role default. Otherwise the
/// candidate whose matching trait is strongest wins.
pub fn decide(request: &DecisionRequest) -> Proposal {
    let mut rng = StdRng::seed_from_u64(request.seed);
    let persona = &request.persona;
    let draw: f64 = rng.gen_range(0.0..1.0);

    if draw < persona.stress || request.candidates.is_empty() {
        return Proposal {
            action: request.role_default.clone(),
            rationale: format!(
                "Too stressed to act (stress {:.2}); falling back to {}",
                persona.stress, request.role_default
            ),
            says: "Not right now, I need a minute.".to_string(),
            urgency: Urgency::Low,
        };
    }

    let mut best: Option<(&String, f64)> = None;
    for candidate in &request.candidates {
        let score = affinity(&persona.personality, candidate) + rng.gen_range(0.0..TIE_BREAK);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    let (action, score) = match best {
        Some((action, score)) => (action.clone(), score),
        None => (request.role_default.clone(), 0.0),
    };

    Proposal {
        rationale: format!("{} fits their strengths best (score {score:.2})", action),
        says: format!("I'll {}.", action.replace('_', " ")),
        urgency: urgency_for(persona.mental_load),
        action,
    }
}

/// Trait an action draws on, by keyword.
fn affinity(personality: &Personality, action: &str) -> f64 {
    let action = action.to_ascii_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| action.contains(w));

    if has(&["task", "chore"]) {
        personality.initiative
    } else if has(&["calendar", "schedule"]) {
        personality.awareness
    } else if has(&["help", "suggest", "delegate"]) {
        personality.helpfulness
    } else if has(&["plan", "organize", "read", "study"]) {
        personality.detail_orientation
    } else if has(&["play", "explore"]) {
        personality.curiosity.unwrap_or(personality.initiative)
    } else if has(&["rest", "screen"]) {
        1.0 - personality.follow_through
    } else {
        personality.follow_through
    }
}

fn urgency_for(mental_load: f64) -> Urgency {
    if mental_load > 0.7 {
        Urgency::High
    } else if mental_load < 0.35 {
        Urgency::Low
    } else {
        Urgency::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::backend::test_support::request;

    #[test]
    fn same_seed_same_answer() {
        let req = request(&["create_task", "schedule_event", "rest"], 0.3, 99);
        assert_eq!(decide(&req), decide(&req));
    }

    #[test]
    fn full_stress_always_defaults() {
        for seed in 0..50 {
            let req = request(&["create_task"], 1.0, seed);
            let p = decide(&req);
            assert_eq!(p.action, "check_calendar");
            assert!(p.rationale.contains("Too stressed"));
        }
    }

    #[test]
    fn zero_stress_picks_a_candidate() {
        for seed in 0..50 {
            let req = request(&["create_task", "schedule_event"], 0.0, seed);
            let p = decide(&req);
            assert!(req.candidates.contains(&p.action));
        }
    }

    #[test]
    fn strongest_trait_wins() {
        let mut req = request(&["create_task", "schedule_event"], 0.0, 3);
        req.persona.personality.awareness = 0.9;
        req.persona.personality.initiative = 0.1;
        assert_eq!(decide(&req).action, "schedule_event");
    }

    #[test]
    fn empty_candidates_default() {
        let req = request(&[], 0.0, 5);
        assert_eq!(decide(&req).action, "check_calendar");
    }

    #[tokio::test]
    async fn backend_never_fails() {
        let req = request(&["create_task"], 0.4, 11);
        let backend = RuleBasedBackend::new();
        assert_eq!(backend.name(), "rules");
        assert!(backend.propose(&req).await.is_ok());
    }
}
