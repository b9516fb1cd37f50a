#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Lifecycle events emitted by training, prediction and model registration runs.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::broadcast};
use uuid::Uuid;

/// Event encoded as a single JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier (`evt-<uuid>`).
    pub id: String,
    /// Component producing the event.
    pub source: String,
    /// Dotted event type (e.g. `registration.completed`).
    pub event_type: String,
    /// RFC3339 timestamp.
    pub timestamp: String,
    /// Event body.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Creates a record stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: format!("evt-{}", Uuid::new_v4()),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now().to_rfc3339(),
            payload,
        }
    }
}

/// Sink for lifecycle events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event.
    async fn publish(&self, event: EventRecord) -> Result<()>;
}

/// In-process bus with a bounded backlog, used by the CLI and in tests.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<EventRecord>,
    backlog: Arc<Mutex<VecDeque<EventRecord>>>,
    capacity: usize,
}

impl MemoryEventBus {
    /// Creates a bus retaining at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Returns a live receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Retained events, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.backlog.lock().iter().cloned().collect()
    }

    /// Retained events of one type, oldest first.
    #[must_use]
    pub fn events_of(&self, event_type: &str) -> Vec<EventRecord> {
        self.backlog
            .lock()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish(&self, event: EventRecord) -> Result<()> {
        {
            let mut backlog = self.backlog.lock();
            if backlog.len() == self.capacity {
                backlog.pop_front();
            }
            backlog.push_back(event.clone());
        }
        // No subscribers is not an error.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Publisher appending JSON lines to a file.
#[derive(Debug, Clone)]
pub struct FileEventPublisher {
    path: PathBuf,
}

impl FileEventPublisher {
    /// Creates the parent directory and targets `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Destination file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventPublisher for FileEventPublisher {
    async fn publish(&self, event: EventRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn memory_bus_delivers_to_subscribers() {
        let bus = MemoryEventBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(EventRecord::new("engine", "engine.train.completed", json!({})))
            .await
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "engine.train.completed");
        assert!(event.id.starts_with("evt-"));
    }

    #[tokio::test]
    async fn memory_bus_backlog_is_bounded() {
        let bus = MemoryEventBus::new(2);
        for idx in 0..3 {
            bus.publish(EventRecord::new("registration", "step", json!({ "idx": idx })))
                .await
                .unwrap();
        }
        let retained = bus.snapshot();
        assert_eq!(retained.len(), 2);
        assert_eq!(retained[0].payload["idx"], 1);
        assert_eq!(bus.events_of("step").len(), 2);
        assert!(bus.events_of("other").is_empty());
    }

    #[tokio::test]
    async fn file_publisher_appends_lines() {
        let dir = tempdir().unwrap();
        let publisher = FileEventPublisher::new(dir.path().join("events/out.jsonl")).unwrap();
        publisher
            .publish(EventRecord::new("registration", "registration.completed", json!({})))
            .await
            .unwrap();
        publisher
            .publish(EventRecord::new("registration", "registration.failed", json!({})))
            .await
            .unwrap();
        let content = std::fs::read_to_string(publisher.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("registration.failed"));
    }
}
