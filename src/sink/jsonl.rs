//! JSON-lines file sink.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::SinkError;
use crate::sink::{Record, RecordSink};

/// Appends one JSON object per line. Lines from concurrent writes never
/// interleave, but their order follows completion, not dispatch.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<tokio::io::BufWriter<tokio::fs::File>>,
}

impl JsonlSink {
    /// Create (or truncate) the output file, making parent directories.
    pub async fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(tokio::io::BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn write(&self, record: Record) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::WriteFailed {
                sink: format!("jsonl:{}", self.path.display()),
                reason: e.to_string(),
            })
    }

    async fn flush(&self) -> Result<(), SinkError> {
        let mut file = self.file.lock().await;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::survey_record;

    #[tokio::test]
    async fn writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        let sink = JsonlSink::create(&path).await.unwrap();
        sink.write(survey_record(1)).await.unwrap();
        sink.write(survey_record(2)).await.unwrap();
        sink.flush().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: Record = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, survey_record(2));
    }
}
