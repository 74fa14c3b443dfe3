//! Persistence sinks for generated records.
//!
//! The orchestrator never reads anything back from a sink. Writes are fire and
//! forget, dispatched concurrently by [`SinkDispatcher`] and joined at day and
//! run boundaries. In dry-run mode no sink exists at all.

mod dispatcher;
mod jsonl;

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use dispatcher::SinkDispatcher;
pub use jsonl::JsonlSink;

use crate::agent::{AgentMetrics, MemberKey};
use crate::error::SinkError;
use crate::sim::{AggregateCounters, EventEntry, Phase};

/// Periodic whole-family update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilySnapshot {
    pub run_id: Uuid,
    pub day: u32,
    pub date: NaiveDate,
    pub phase: Phase,
    /// True for the end-of-run update.
    pub final_update: bool,
    pub counters: AggregateCounters,
    pub members: Vec<AgentMetrics>,
    /// Share of all tasks assigned to each member, in percent.
    pub task_distribution: BTreeMap<MemberKey, f64>,
}

/// One unit of work for a sink. Always an owned copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    Activity(EventEntry),
    FamilySnapshot(FamilySnapshot),
}

impl Record {
    pub fn label(&self) -> &'static str {
        match self {
            Record::Activity(entry) => entry.kind.as_str(),
            Record::FamilySnapshot(_) => "family_snapshot",
        }
    }
}

/// Write and failure totals for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkStats {
    pub writes: u64,
    pub failures: u64,
}

impl SinkStats {
    /// True when every dispatched write succeeded.
    pub fn fully_persisted(&self) -> bool {
        self.failures == 0
    }
}

/// A record store that accepts typed records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    fn name(&self) -> &str;

    async fn write(&self, record: Record) -> Result<(), SinkError>;

    /// Push buffered data to durable storage.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// In-memory sink that keeps every record it accepts.
///
/// Can be told to fail every n-th write.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Record>>,
    fail_every: Option<usize>,
    attempts: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail attempts `n`, `2n`, ... (`n = 1` fails everything).
    pub fn failing_every(n: usize) -> Self {
        Self {
            fail_every: Some(n.max(1)),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn write(&self, record: Record) -> Result<(), SinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every.is_some_and(|n| attempt % n == 0) {
            return Err(SinkError::WriteFailed {
                sink: self.name().to_string(),
                reason: format!("injected failure on write {attempt}"),
            });
        }
        let mut records = self.records.lock().map_err(|_| SinkError::Closed {
            sink: self.name().to_string(),
        })?;
        records.push(record);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use super::Record;
    use crate::sim::{ActivityRecord, EventEntry, EventKind, Phase};

    pub fn survey_record(n: u32) -> Record {
        Record::Activity(EventEntry {
            sequence: u64::from(n),
            timestamp: NaiveDate::from_ymd_opt(2025, 1, 7)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            day: 7,
            phase: Phase::Chaos,
            kind: EventKind::Survey,
            agent: None,
            payload: ActivityRecord::Survey { survey_number: n },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::survey_record;
    use super::*;

    #[tokio::test]
    async fn recording_sink_keeps_records() {
        let sink = RecordingSink::new();
        sink.write(survey_record(1)).await.unwrap();
        sink.write(survey_record(2)).await.unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[0].label(), "survey");
    }

    #[tokio::test]
    async fn recording_sink_injects_failures() {
        let sink = RecordingSink::failing_every(2);
        assert!(sink.write(survey_record(1)).await.is_ok());
        assert!(sink.write(survey_record(2)).await.is_err());
        assert!(sink.write(survey_record(3)).await.is_ok());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.attempts(), 3);
    }

    #[test]
    fn record_serializes_with_tags() {
        let json = serde_json::to_value(survey_record(4)).unwrap();
        assert_eq!(json["record"], "activity");
        assert_eq!(json["payload"]["type"], "survey");
        assert_eq!(json["payload"]["survey_number"], 4);
    }
}
