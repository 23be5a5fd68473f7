//! Result sinks - where emitted windowed counts go
//!
//! The pipeline emits one `WindowedCount` per store update; what happens
//! to it afterwards (batching, delivery guarantees) belongs to the
//! consumer. Three backends cover the runtime and the tests: structured
//! log lines, an append-only JSONL file, and a channel for assertions.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use super::types::WindowedCount;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sink channel closed")]
    ChannelClosed,
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Deliver a single windowed count update
    async fn emit(&self, result: WindowedCount) -> Result<(), SinkError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Logs every update; the default sink for the runtime binary.
pub struct LogResultSink;

#[async_trait]
impl ResultSink for LogResultSink {
    async fn emit(&self, result: WindowedCount) -> Result<(), SinkError> {
        log::info!(
            "🧮 {} [{}..{}) -> {}",
            result.product,
            result.window_start_ms,
            result.window_end_ms,
            result.count
        );
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "LOG"
    }
}

/// Appends one JSON line per update.
pub struct JsonlResultSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlResultSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        log::info!("📝 Writing windowed counts to: {}", path.display());

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

#[async_trait]
impl ResultSink for JsonlResultSink {
    async fn emit(&self, result: WindowedCount) -> Result<(), SinkError> {
        let json = serde_json::to_string(&result)?;
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}

/// Forwards updates into an mpsc channel; used by tests and embedders.
pub struct ChannelResultSink {
    tx: mpsc::Sender<WindowedCount>,
}

impl ChannelResultSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<WindowedCount>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ResultSink for ChannelResultSink {
    async fn emit(&self, result: WindowedCount) -> Result<(), SinkError> {
        self.tx
            .send(result)
            .await
            .map_err(|_| SinkError::ChannelClosed)
    }

    fn backend_type(&self) -> &'static str {
        "CHANNEL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_count(product: &str, start_ms: i64, count: u64) -> WindowedCount {
        WindowedCount {
            product: product.to_string(),
            window_start_ms: start_ms,
            window_end_ms: start_ms + 5_000,
            count,
        }
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends_one_line_per_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.jsonl");

        let sink = JsonlResultSink::new(&path).unwrap();
        sink.emit(make_count("Laptop", 0, 1)).await.unwrap();
        sink.emit(make_count("Laptop", 0, 2)).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let last: WindowedCount = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last, make_count("Laptop", 0, 2));
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_updates() {
        let (sink, mut rx) = ChannelResultSink::new(16);

        sink.emit(make_count("Phone", 5_000, 3)).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.product, "Phone");
        assert_eq!(received.count, 3);
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed_receiver() {
        let (sink, rx) = ChannelResultSink::new(1);
        drop(rx);

        let err = sink.emit(make_count("Phone", 0, 1)).await.unwrap_err();
        assert!(matches!(err, SinkError::ChannelClosed));
    }
}
