//! Simulated time, the event log and the orchestrator that drives a run.

pub mod activities;
mod clock;
pub mod contacts;
mod counters;
mod events;
mod orchestrator;
mod phase;
mod result;

pub use clock::{OVERNIGHT_MINUTES, PhaseEntry, SimulationClock, TimeBlock};
pub use counters::AggregateCounters;
pub use events::{ActivityRecord, EventEntry, EventKind, EventLog, MessageChannel, TaskSource};
pub use orchestrator::Orchestrator;
pub use phase::{Phase, PhaseSchedule, habit_completion_probability};
pub use result::{RunResult, task_distribution};
