//! Decision backends that persona agents delegate to.
//!
//! Two implementations share one trait: a remote reasoning service and a
//! local rule that always succeeds. [`create_decision_backend`] chains them so
//! the rule answers whenever the remote call fails.

mod backend;
mod fallback;
mod remote;
pub mod rules;

use std::sync::Arc;

pub use backend::{DecisionBackend, DecisionRequest, PersonaSnapshot, Proposal, Urgency};
pub use fallback::FallbackBackend;
pub use remote::RemoteBackend;
pub use rules::RuleBasedBackend;

#[cfg(test)]
pub(crate) use backend::test_support;

use crate::config::{BackendConfig, BackendKind};
use crate::error::BackendError;

/// Build the backend described by `config`.
pub fn create_decision_backend(
    config: &BackendConfig,
) -> Result<Arc<dyn DecisionBackend>, BackendError> {
    match config.kind {
        BackendKind::Rules => {
            tracing::debug!("Using rule-based decision backend");
            Ok(Arc::new(RuleBasedBackend::new()))
        }
        BackendKind::Remote => {
            let remote_config = config.remote.clone().ok_or_else(|| BackendError::Unavailable {
                backend: "remote".to_string(),
            })?;
            tracing::info!(
                base_url = %remote_config.base_url,
                model = %remote_config.model,
                "Using remote decision backend with rule-based fallback"
            );
            let remote: Arc<dyn DecisionBackend> = Arc::new(RemoteBackend::new(remote_config)?);
            let rules: Arc<dyn DecisionBackend> = Arc::new(RuleBasedBackend::new());
            Ok(Arc::new(FallbackBackend::new(vec![remote, rules], config.timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_backend_by_default() {
        let backend = create_decision_backend(&BackendConfig::default()).unwrap();
        assert_eq!(backend.name(), "rules");
    }

    #[test]
    fn remote_without_settings_is_unavailable() {
        let config = BackendConfig {
            kind: BackendKind::Remote,
            remote: None,
            ..BackendConfig::default()
        };
        assert!(matches!(
            create_decision_backend(&config),
            Err(BackendError::Unavailable { .. })
        ));
    }
}
