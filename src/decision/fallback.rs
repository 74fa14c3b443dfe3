//! Fallback chaining across decision backends.
//!
//! Wraps several backends and tries each in order until one answers within
//! the per-call timeout. Callers see the same `DecisionBackend` trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::decision::backend::{DecisionBackend, DecisionRequest, Proposal};
use crate::error::BackendError;

/// A backend that tries its members in sequence.
///
/// The first member is the primary. Any failure, including a timeout, moves on
/// to the next member. Put a [`RuleBasedBackend`](super::RuleBasedBackend) last
/// to make the chain infallible.
pub struct FallbackBackend {
    backends: Vec<Arc<dyn DecisionBackend>>,
    per_call_timeout: Duration,
}

impl FallbackBackend {
    /// Returns an error if `backends` is empty.
    pub fn new(
        backends: Vec<Arc<dyn DecisionBackend>>,
        per_call_timeout: Duration,
    ) -> Result<Self, BackendError> {
        if backends.is_empty() {
            return Err(BackendError::Unavailable {
                backend: "fallback".to_string(),
            });
        }
        Ok(Self {
            backends,
            per_call_timeout,
        })
    }

    fn primary(&self) -> &dyn DecisionBackend {
        self.backends[0].as_ref()
    }

    async fn call_with_timeout(
        &self,
        backend: &dyn DecisionBackend,
        request: &DecisionRequest,
    ) -> Result<Proposal, BackendError> {
        match tokio::time::timeout(self.per_call_timeout, backend.propose(request)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout {
                backend: backend.name().to_string(),
                timeout: self.per_call_timeout,
            }),
        }
    }
}

#[async_trait]
impl DecisionBackend for FallbackBackend {
    fn name(&self) -> &str {
        self.primary().name()
    }

    async fn propose(&self, request: &DecisionRequest) -> Result<Proposal, BackendError> {
        let mut last_error: Option<BackendError> = None;

        for (i, backend) in self.backends.iter().enumerate() {
            match self.call_with_timeout(backend.as_ref(), request).await {
                Ok(proposal) => return Ok(proposal),
                Err(err) => {
                    if let Some(next) = self.backends.get(i + 1) {
                        tracing::warn!(
                            backend = %backend.name(),
                            error = %err,
                            next_backend = %next.name(),
                            "Decision backend failed, trying next backend"
                        );
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BackendError::Unavailable {
            backend: "fallback".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::decision::backend::test_support::request;
    use crate::decision::backend::Urgency;
    use crate::decision::rules::RuleBasedBackend;

    /// A mock backend that always answers the same way and counts calls.
    struct MockBackend {
        name: String,
        result: Result<Proposal, String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockBackend {
        fn succeeding(name: &str, action: &str) -> Self {
            Self {
                name: name.to_string(),
                result: Ok(Proposal {
                    action: action.to_string(),
                    rationale: format!("{name} says so"),
                    says: String::new(),
                    urgency: Urgency::Normal,
                }),
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(name: &str) -> Self {
            Self {
                result: Err("server error".to_string()),
                ..Self::succeeding(name, "")
            }
        }

        fn slow(name: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::succeeding(name, "create_task")
            }
        }
    }

    #[async_trait]
    impl DecisionBackend for MockBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn propose(&self, _request: &DecisionRequest) -> Result<Proposal, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.result.clone().map_err(|reason| BackendError::RequestFailed {
                backend: self.name.clone(),
                reason,
            })
        }
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert!(FallbackBackend::new(vec![], Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn primary_answers_first() {
        let primary = Arc::new(MockBackend::succeeding("primary", "create_task"));
        let secondary = Arc::new(MockBackend::succeeding("secondary", "schedule_event"));
        let chain = FallbackBackend::new(
            vec![primary.clone() as Arc<dyn DecisionBackend>, secondary.clone()],
            Duration::from_secs(1),
        )
        .unwrap();

        let p = chain.propose(&request(&["create_task"], 0.1, 1)).await.unwrap();
        assert_eq!(p.action, "create_task");
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.name(), "primary");
    }

    #[tokio::test]
    async fn failure_moves_to_next() {
        let primary = Arc::new(MockBackend::failing("primary"));
        let chain = FallbackBackend::new(
            vec![primary.clone() as Arc<dyn DecisionBackend>, Arc::new(RuleBasedBackend)],
            Duration::from_secs(1),
        )
        .unwrap();

        let req = request(&["create_task"], 0.1, 1);
        let p = chain.propose(&req).await.unwrap();
        assert!(req.accepts(&p.action));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let slow = Arc::new(MockBackend::slow("slow", Duration::from_secs(5)));
        let chain = FallbackBackend::new(
            vec![
                slow as Arc<dyn DecisionBackend>,
                Arc::new(MockBackend::succeeding("backup", "schedule_event")),
            ],
            Duration::from_millis(50),
        )
        .unwrap();

        let p = chain.propose(&request(&["schedule_event"], 0.1, 1)).await.unwrap();
        assert_eq!(p.action, "schedule_event");
    }

    #[tokio::test]
    async fn all_failing_returns_last_error() {
        let chain = FallbackBackend::new(
            vec![
                Arc::new(MockBackend::failing("a")) as Arc<dyn DecisionBackend>,
                Arc::new(MockBackend::failing("b")),
            ],
            Duration::from_secs(1),
        )
        .unwrap();

        let err = chain.propose(&request(&["x"], 0.1, 1)).await.unwrap_err();
        assert!(err.to_string().contains("Backend b"));
    }
}
