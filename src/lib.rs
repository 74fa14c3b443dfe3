//! Household behavior simulation engine.
//!
//! Five persona agents (two adults, three children) are driven through a
//! simulated year by an [`Orchestrator`](sim::Orchestrator). The household
//! moves through five phases, and each member's traits shift as it goes. The
//! run emits a stream of synthetic activity records (tasks, calendar events,
//! surveys, interviews, habits, documents, messages) into an in-memory log
//! and, in write mode, a [`RecordSink`](sink::RecordSink).
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hearth::agent::{Household, IdentityMap};
//! use hearth::config::SimConfig;
//! use hearth::observability::NoopObserver;
//! use hearth::sim::Orchestrator;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> hearth::error::Result<()> {
//! let config = SimConfig::default();
//! let household = Household::from_identities(&IdentityMap::generated(config.seed), config.seed)?;
//! let mut orchestrator = Orchestrator::new(config, household, Arc::new(NoopObserver))?;
//! let result = orchestrator.run(CancellationToken::new()).await?;
//! println!("{}", result.render_table());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod decision;
pub mod error;
pub mod observability;
pub mod sim;
pub mod sink;
pub mod util;

pub use config::SimConfig;
pub use error::{Error, Result};
pub use sim::{Orchestrator, RunResult};
