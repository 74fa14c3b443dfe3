//! A short two-week run plus the adult arcs and decision fallback exercised
//! through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use hearth::agent::{
    DecisionContext, Household, IdentityMap, MemberKey, OverloadedAdult, Persona, Role,
    UnderAwareAdult,
};
use hearth::config::SimConfig;
use hearth::decision::{DecisionBackend, DecisionRequest, Proposal};
use hearth::error::BackendError;
use hearth::observability::RecordingObserver;
use hearth::observability::ObserverEvent;
use hearth::sim::{EventKind, Orchestrator, Phase};

const EVENING: [&str; 5] = [
    "create_task",
    "schedule_event",
    "check_calendar",
    "help_with_homework",
    "rest",
];

/// Backend that never answers successfully.
struct BrokenBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl DecisionBackend for BrokenBackend {
    fn name(&self) -> &str {
        "broken"
    }

    async fn propose(&self, _request: &DecisionRequest) -> Result<Proposal, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Unavailable {
            backend: "broken".to_string(),
        })
    }
}

/// Backend that never answers at all.
struct StalledBackend;

#[async_trait]
impl DecisionBackend for StalledBackend {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn propose(&self, _request: &DecisionRequest) -> Result<Proposal, BackendError> {
        std::future::pending().await
    }
}

fn identities() -> IdentityMap {
    IdentityMap::generated(42)
}

fn context(day: u32) -> DecisionContext {
    let at = NaiveDate::from_ymd_opt(2025, 1, day)
        .unwrap()
        .and_hms_opt(19, 0, 0)
        .unwrap();
    DecisionContext::new("Weekday evening after dinner", &EVENING, at)
}

#[tokio::test]
async fn two_week_run() {
    let config = SimConfig {
        days: 14,
        start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        ..SimConfig::default()
    };
    let household = Household::from_identities(&identities(), config.seed).unwrap();
    let (observer, events, _) = RecordingObserver::new();
    let mut orch = Orchestrator::new(config, household, Arc::new(observer)).unwrap();
    let result = orch.run(CancellationToken::new()).await.unwrap();

    assert_eq!(result.days_completed, 14);
    assert_eq!(result.final_phase, Phase::Chaos);
    assert_eq!(result.counters.interviews, 5);
    assert_eq!(result.counters.surveys, 2);
    assert_eq!(result.counters.meetings, 0);
    assert!(result.counters.calendar_events > 0);
    assert_eq!(orch.log().count(EventKind::Meeting), 0);
    assert_eq!(orch.clock().date(), NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());

    let events = events.lock().unwrap();
    let days: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ObserverEvent::DayComplete { day, .. } => Some(*day),
            _ => None,
        })
        .collect();
    assert_eq!(days, (1..=14).collect::<Vec<_>>());
    assert!(matches!(events.first(), Some(ObserverEvent::RunStart { days: 14, .. })));
    assert!(matches!(
        events.last(),
        Some(ObserverEvent::RunEnd {
            days_completed: 14,
            cancelled: false,
            ..
        })
    ));
}

#[test]
fn overloaded_adult_reaches_balanced_values_once() {
    let identity = identities().require(MemberKey::OverloadedAdult).unwrap().clone();
    let mut adult = OverloadedAdult::new(identity, 42);

    assert!(adult.advance_phase(Phase::Balanced));
    assert_eq!(adult.agent().state().mental_load, 0.55);
    assert_eq!(adult.agent().state().stress, 0.385);

    let state = adult.agent().state().clone();
    let behavior = adult.agent().behavior().clone();
    assert!(!adult.advance_phase(Phase::Balanced));
    assert!(!adult.advance_phase(Phase::Discovery));
    assert_eq!(adult.agent().state(), &state);
    assert_eq!(adult.agent().behavior(), &behavior);
}

#[test]
fn under_aware_adult_grows_more_aware_each_phase() {
    let identity = identities().require(MemberKey::UnderAwareAdult).unwrap().clone();
    let mut adult = UnderAwareAdult::new(identity, 42);

    let mut last = adult.agent().personality().awareness;
    for phase in &Phase::ALL[1..] {
        assert!(adult.advance_phase(*phase));
        let now = adult.agent().personality().awareness;
        assert!(now > last, "{phase}: {now} <= {last}");
        last = now;
    }
    assert_eq!(last, 0.80);
}

#[tokio::test]
async fn failing_backend_still_yields_a_decision() {
    let identity = identities().require(MemberKey::UnderAwareAdult).unwrap().clone();
    let mut adult = UnderAwareAdult::new(identity, 42);
    let backend = Arc::new(BrokenBackend {
        calls: AtomicUsize::new(0),
    });
    adult
        .agent_mut()
        .set_backend(backend.clone(), Duration::from_secs(1));

    for day in 1..=3 {
        let decision = adult.agent_mut().decide_next_action(&context(day)).await;
        assert!(decision.fallback);
        assert!(
            EVENING.contains(&decision.action.as_str())
                || decision.action == Role::Adult.default_action()
        );
        assert!(!decision.rationale.is_empty());
        assert_eq!(adult.agent().history().len(), day as usize);
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn stalled_backend_times_out_into_the_local_rule() {
    let identity = identities().require(MemberKey::OverloadedAdult).unwrap().clone();
    let mut adult = OverloadedAdult::new(identity, 42);
    adult
        .agent_mut()
        .set_backend(Arc::new(StalledBackend), Duration::from_millis(50));

    let decision = adult.agent_mut().decide_next_action(&context(2)).await;
    assert!(decision.fallback);
    assert_eq!(adult.agent().history().len(), 1);
    assert!(adult.agent().history()[0].fallback);
}
