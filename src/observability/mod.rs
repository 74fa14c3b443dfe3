//! Progress reporting: trait-based event and metric recording.
//!
//! | Backend     | Description |
//! |-------------|-------------|
//! | `noop`      | Discards everything (default) |
//! | `log`       | Emits structured events via `tracing` |
//! | `recording` | Captures events in memory for assertions |
//!
//! [`create_observer`] picks the backend from the run's verbosity flag.

mod log;
mod noop;
pub mod recording;
pub mod traits;

use std::sync::Arc;

pub use self::log::LogObserver;
pub use self::noop::NoopObserver;
pub use self::recording::RecordingObserver;
pub use self::traits::{Observer, ObserverEvent, ObserverMetric};

/// [`LogObserver`] for verbose runs, [`NoopObserver`] otherwise.
pub fn create_observer(verbose: bool) -> Arc<dyn Observer> {
    if verbose {
        Arc::new(LogObserver)
    } else {
        Arc::new(NoopObserver)
    }
}

#[cfg(test)]
mod tests {
    use crate::observability::*;

    #[test]
    fn factory_returns_noop_when_quiet() {
        assert_eq!(create_observer(false).name(), "noop");
    }

    #[test]
    fn factory_returns_log_when_verbose() {
        assert_eq!(create_observer(true).name(), "log");
    }
}
