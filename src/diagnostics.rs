//! Append-only diagnostics sink for outbound requests and raw responses.
//!
//! Diagnostics are a side channel. [`Diagnostics::append`] has no error
//! return, so a broken sink can never change what the pipeline answers.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Sink accepting `(channel, event, payload)` triples.
#[async_trait]
pub trait Diagnostics: Send + Sync {
    async fn append(&self, channel: &str, event: &str, payload: Value);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

#[async_trait]
impl Diagnostics for NoopDiagnostics {
    async fn append(&self, _channel: &str, _event: &str, _payload: Value) {}
}

/// Appends one JSON object per line to a file.
///
/// Writers are serialized so concurrent events never interleave.
#[derive(Debug, Clone)]
pub struct JsonlDiagnostics {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonlDiagnostics {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl Diagnostics for JsonlDiagnostics {
    async fn append(&self, channel: &str, event: &str, payload: Value) {
        let entry = json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "channel": channel,
            "event": event,
            "payload": payload,
        });

        if let Err(e) = self.write_line(&entry.to_string()).await {
            warn!(path = %self.path.display(), "Failed to append diagnostics entry: {e}");
        }
    }
}

/// Collects events in memory for assertions.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryDiagnostics {
    pub events: std::sync::Mutex<Vec<(String, String, Value)>>,
}

#[cfg(test)]
impl MemoryDiagnostics {
    pub fn events_for(&self, channel: &str, event: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, e, _)| c == channel && e == event)
            .map(|(_, _, p)| p.clone())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl Diagnostics for MemoryDiagnostics {
    async fn append(&self, channel: &str, event: &str, payload: Value) {
        self.events
            .lock()
            .unwrap()
            .push((channel.to_string(), event.to_string(), payload));
    }
}
