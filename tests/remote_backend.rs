//! Remote decision backend against a mock OpenAI-compatible server.
//!
//! Each test spins up an axum server on a random port that answers
//! `/v1/chat/completions` with a canned body, then drives the backend (and
//! the fallback chain in front of it) through the public API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use chrono::NaiveDate;

use hearth::agent::{
    AgentState, BehaviorPattern, DecisionContext, IdentityMap, MemberKey, PersonaAgent,
    Personality, Role,
};
use hearth::config::RemoteBackendConfig;
use hearth::decision::{
    DecisionBackend, DecisionRequest, FallbackBackend, PersonaSnapshot, RemoteBackend,
    RuleBasedBackend, Urgency,
};
use hearth::error::BackendError;
use hearth::sim::Phase;

const CANDIDATES: [&str; 3] = ["create_task", "schedule_event", "rest"];

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Arc<String>,
    hits: Arc<AtomicUsize>,
}

async fn completions(State(state): State<MockState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        state.status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        state.body.as_str().to_string(),
    )
}

/// Start the mock server and return its address plus a hit counter.
async fn start_mock_server(status: StatusCode, body: String) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = MockState {
        status,
        body: Arc::new(body),
        hits: Arc::clone(&hits),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

/// Chat completion body whose assistant message is `content`.
fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

fn action_content(action: &str) -> String {
    serde_json::json!({
        "action": action,
        "rationale": "The week looks packed",
        "says": "I'll put it on the calendar.",
        "urgency": "high"
    })
    .to_string()
}

fn remote_config(addr: SocketAddr) -> RemoteBackendConfig {
    RemoteBackendConfig {
        base_url: format!("http://{addr}"),
        model: "test-model".to_string(),
        api_key: None,
        max_tokens: 256,
        max_response_bytes: 4096,
        request_timeout: Duration::from_secs(5),
    }
}

fn request() -> DecisionRequest {
    let state = AgentState::with_mental_load(0.5);
    DecisionRequest {
        persona: PersonaSnapshot {
            name: "Sam".to_string(),
            role: Role::Adult,
            phase: Phase::Chaos,
            personality: Personality::uniform(0.5),
            behavior: BehaviorPattern::uniform(0.5),
            mood: state.mood,
            energy: state.energy,
            stress: state.stress,
            mental_load: state.mental_load,
        },
        situation: "Weekday evening".to_string(),
        candidates: CANDIDATES.iter().map(|c| c.to_string()).collect(),
        role_default: Role::Adult.default_action().to_string(),
        seed: 11,
    }
}

fn chain(remote: RemoteBackend) -> FallbackBackend {
    let remote: Arc<dyn DecisionBackend> = Arc::new(remote);
    let rules: Arc<dyn DecisionBackend> = Arc::new(RuleBasedBackend::new());
    FallbackBackend::new(vec![remote, rules], Duration::from_secs(5)).unwrap()
}

fn agent() -> PersonaAgent {
    let identity = IdentityMap::generated(3)
        .require(MemberKey::OverloadedAdult)
        .unwrap()
        .clone();
    PersonaAgent::new(
        MemberKey::OverloadedAdult,
        identity,
        Personality::uniform(0.8),
        BehaviorPattern::uniform(0.8),
        AgentState::with_mental_load(0.4),
        3,
    )
}

fn context() -> DecisionContext {
    let at = NaiveDate::from_ymd_opt(2025, 3, 4)
        .unwrap()
        .and_hms_opt(18, 30, 0)
        .unwrap();
    DecisionContext::new("Evening at home", &CANDIDATES, at)
}

#[tokio::test]
async fn remote_proposal_is_parsed() {
    let (addr, hits) =
        start_mock_server(StatusCode::OK, completion_body(&action_content("schedule_event"))).await;
    let backend = RemoteBackend::new(remote_config(addr)).unwrap();

    let proposal = backend.propose(&request()).await.unwrap();
    assert_eq!(proposal.action, "schedule_event");
    assert_eq!(proposal.urgency, Urgency::High);
    assert_eq!(proposal.says, "I'll put it on the calendar.");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_action_is_an_invalid_response() {
    let (addr, _) =
        start_mock_server(StatusCode::OK, completion_body(&action_content("buy_a_boat"))).await;
    let backend = RemoteBackend::new(remote_config(addr)).unwrap();

    let err = backend.propose(&request()).await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidResponse { .. }), "{err}");
}

#[tokio::test]
async fn prose_reply_is_an_invalid_response() {
    let (addr, _) =
        start_mock_server(StatusCode::OK, completion_body("I think they would rest.")).await;
    let backend = RemoteBackend::new(remote_config(addr)).unwrap();

    let err = backend.propose(&request()).await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidResponse { .. }), "{err}");
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let (addr, _) = start_mock_server(StatusCode::SERVICE_UNAVAILABLE, "{}".to_string()).await;
    let backend = RemoteBackend::new(remote_config(addr)).unwrap();

    let err = backend.propose(&request()).await.unwrap_err();
    assert!(matches!(err, BackendError::Unavailable { .. }), "{err}");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let padding = "x".repeat(8192);
    let (addr, _) = start_mock_server(StatusCode::OK, completion_body(&padding)).await;
    let backend = RemoteBackend::new(remote_config(addr)).unwrap();

    let err = backend.propose(&request()).await.unwrap_err();
    assert!(
        matches!(err, BackendError::ResponseTooLarge { limit: 4096, .. }),
        "{err}"
    );
}

#[tokio::test]
async fn fallback_chain_answers_when_remote_fails() {
    let (addr, hits) = start_mock_server(StatusCode::SERVICE_UNAVAILABLE, "{}".to_string()).await;
    let backend = chain(RemoteBackend::new(remote_config(addr)).unwrap());

    let req = request();
    let proposal = backend.propose(&req).await.unwrap();
    assert!(req.accepts(&proposal.action));
    assert_eq!(backend.name(), "remote");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_server_falls_back() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = chain(RemoteBackend::new(remote_config(addr)).unwrap());
    let req = request();
    let proposal = backend.propose(&req).await.unwrap();
    assert!(req.accepts(&proposal.action));
}

#[tokio::test]
async fn persona_uses_the_remote_answer() {
    let (addr, _) =
        start_mock_server(StatusCode::OK, completion_body(&action_content("create_task"))).await;
    let mut agent = agent();
    agent.set_backend(
        Arc::new(RemoteBackend::new(remote_config(addr)).unwrap()),
        Duration::from_secs(5),
    );

    let decision = agent.decide_next_action(&context()).await;
    assert_eq!(decision.action, "create_task");
    assert!(!decision.fallback);
    assert_eq!(agent.history().len(), 1);
    assert_eq!(agent.state().last_action.as_deref(), Some("create_task"));
}

#[tokio::test]
async fn persona_falls_back_on_a_bad_remote_answer() {
    let (addr, _) =
        start_mock_server(StatusCode::OK, completion_body(&action_content("buy_a_boat"))).await;
    let mut agent = agent();
    agent.set_backend(
        Arc::new(RemoteBackend::new(remote_config(addr)).unwrap()),
        Duration::from_secs(5),
    );

    let decision = agent.decide_next_action(&context()).await;
    assert!(decision.fallback);
    assert!(
        CANDIDATES.contains(&decision.action.as_str())
            || decision.action == Role::Adult.default_action()
    );
    assert!(agent.history()[0].fallback);
}
