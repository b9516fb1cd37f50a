use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use once_cell::sync::OnceCell;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::{JsonLogger, LogLevel, LogRecord};

/// Builder for [`Telemetry`].
pub struct TelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl TelemetryBuilder {
    /// Starts a builder for `module`.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            event_publisher: None,
        }
    }

    /// Writes JSON log lines to `path`.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops log records below `level`.
    #[must_use]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Publishes events through `publisher`.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Opens the log file and returns the handle.
    pub fn build(self) -> Result<Telemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::with_level(path, self.min_level)?),
            None => None,
        };
        Ok(Telemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
                events: self.event_publisher.map(EventHandle::new),
            }),
        })
    }
}

/// Cheaply clonable logging and event handle.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("module", &self.inner.module)
            .field("logger", &self.inner.logger.as_ref().map(JsonLogger::path))
            .field("events", &self.inner.events.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
    events: Option<EventHandle>,
}

struct EventHandle {
    publisher: Arc<dyn EventPublisher>,
    // Only built when an event is emitted from outside any tokio runtime.
    fallback: OnceCell<Runtime>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher,
            fallback: OnceCell::new(),
        }
    }

    fn publish_detached(&self, record: EventRecord) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            let publisher = Arc::clone(&self.publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(record).await {
                    eprintln!("telemetry event publish failed: {err:?}");
                }
            });
            return Ok(());
        }
        let runtime = self
            .fallback
            .get_or_try_init(|| Builder::new_current_thread().enable_all().build())?;
        runtime.block_on(self.publisher.publish(record))
    }
}

impl Telemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> TelemetryBuilder {
        TelemetryBuilder::new(module)
    }

    /// Module name stamped on every record.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.module
    }

    /// Writes a structured log line when a log file is configured.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let record =
                LogRecord::new(&self.inner.module, level, message).with_metadata(&metadata);
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Emits an event from synchronous code.
    ///
    /// Inside a tokio runtime the publish is spawned and completes later; outside one it
    /// runs to completion on a private single-threaded runtime before returning.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        match &self.inner.events {
            Some(handle) => handle.publish_detached(self.record(event_type, payload)),
            None => Ok(()),
        }
    }

    /// Emits an event from async code, completing the publish before returning.
    pub async fn emit(&self, event_type: &str, payload: Value) -> Result<()> {
        match &self.inner.events {
            Some(handle) => handle.publisher.publish(self.record(event_type, payload)).await,
            None => Ok(()),
        }
    }

    fn record(&self, event_type: &str, payload: Value) -> EventRecord {
        EventRecord::new(self.inner.module.clone(), event_type, payload)
    }
}
