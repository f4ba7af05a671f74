use super::flush::FlushEngine;
use crate::domain::{ForwarderError, PendingRecord};
use crate::formatter::{JsonFormatter, LogEvent};
use crate::sender::{FlushStats, FlushStatsSnapshot, LogsClient};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shareable front end over a [`FlushEngine`].
///
/// Clones share one engine; every operation takes the engine lock for its whole
/// duration, so a flush in progress blocks other producers until the put (and
/// any throttle stall) completes.
pub struct LogHandler<C: LogsClient> {
    engine: Arc<Mutex<FlushEngine<C>>>,
    formatter: Arc<JsonFormatter>,
    stats: Arc<FlushStats>,
}

impl<C: LogsClient> Clone for LogHandler<C> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            formatter: Arc::clone(&self.formatter),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<C: LogsClient> LogHandler<C> {
    pub fn new(engine: FlushEngine<C>, formatter: JsonFormatter) -> Self {
        let stats = engine.stats();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            formatter: Arc::new(formatter),
            stats,
        }
    }

    pub fn formatter(&self) -> &JsonFormatter {
        &self.formatter
    }

    /// Formats an event and buffers it.
    pub async fn handle(&self, event: &LogEvent) -> Result<(), ForwarderError> {
        let record = self.formatter.to_record(event)?;
        self.submit(record).await
    }

    pub async fn submit(&self, record: PendingRecord) -> Result<(), ForwarderError> {
        self.engine.lock().await.submit(record).await
    }

    pub async fn flush(&self) -> Result<(), ForwarderError> {
        self.engine.lock().await.flush().await
    }

    pub async fn close(&self) -> Result<(), ForwarderError> {
        self.engine.lock().await.close().await
    }

    pub async fn set_stream_name(&self, stream_name: impl Into<String>) -> Result<(), ForwarderError> {
        self.engine.lock().await.set_stream_name(stream_name).await
    }

    pub async fn pending_records(&self) -> usize {
        self.engine.lock().await.pending_records()
    }

    pub async fn stream_name(&self) -> String {
        self.engine.lock().await.destination().stream_name().to_string()
    }

    /// Runs `f` against the engine while holding its lock.
    pub async fn with_engine<R>(&self, f: impl FnOnce(&FlushEngine<C>) -> R) -> R {
        let engine = self.engine.lock().await;
        f(&engine)
    }

    pub fn stats(&self) -> FlushStatsSnapshot {
        self.stats.snapshot()
    }
}
