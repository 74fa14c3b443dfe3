//! Concurrent, bounded dispatch of sink writes.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::SinkError;
use crate::sink::{Record, RecordSink, SinkStats};

/// Spawns each write as its own task, at most `concurrency` running at once.
///
/// Outcomes are only collected at [`checkpoint`](Self::checkpoint), so the
/// day loop never waits on a single write.
pub struct SinkDispatcher {
    sink: Arc<dyn RecordSink>,
    semaphore: Arc<Semaphore>,
    in_flight: JoinSet<Result<(), SinkError>>,
    stats: SinkStats,
}

impl SinkDispatcher {
    pub fn new(sink: Arc<dyn RecordSink>, concurrency: usize) -> Self {
        Self {
            sink,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            in_flight: JoinSet::new(),
            stats: SinkStats::default(),
        }
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Queue a write. Must be called inside a Tokio runtime.
    pub fn dispatch(&mut self, record: Record) {
        let sink = Arc::clone(&self.sink);
        let semaphore = Arc::clone(&self.semaphore);
        self.stats.writes += 1;
        self.in_flight.spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(|_| SinkError::Closed {
                sink: sink.name().to_string(),
            })?;
            sink.write(record).await
        });
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait for every outstanding write, returning how many failed.
    pub async fn checkpoint(&mut self) -> u64 {
        let mut failed = 0;
        while let Some(joined) = self.in_flight.join_next().await {
            let outcome = match joined {
                Ok(result) => result,
                Err(e) => Err(SinkError::WriteFailed {
                    sink: self.sink.name().to_string(),
                    reason: format!("write task panicked or was cancelled: {e}"),
                }),
            };
            if let Err(err) = outcome {
                failed += 1;
                tracing::warn!(sink = %self.sink.name(), error = %err, "Sink write failed");
            }
        }
        self.stats.failures += failed;
        failed
    }

    /// Join outstanding writes and flush the sink.
    pub async fn finish(&mut self) -> SinkStats {
        self.checkpoint().await;
        if let Err(err) = self.sink.flush().await {
            tracing::warn!(sink = %self.sink.name(), error = %err, "Sink flush failed");
        }
        self.stats
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }
}
