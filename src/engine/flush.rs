use crate::buffer::{ChronologicalBatch, DATA_AMOUNT_LIMIT, MAX_BATCH_SIZE, chunk_record};
use crate::domain::{DestinationIdentity, ForwarderError, PendingRecord};
use crate::reliability::{Clock, ResourceBootstrapper, ThrottleGate};
use crate::sender::{
    ClientError, DescribeLogStreamsRequest, ErrorKind, FlushStats, InputLogEvent, LogsClient,
    PutLogEventsRequest,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Whether puts carry a per-stream sequence token.
///
/// Current backends order events server-side and ignore tokens; older API
/// versions reject a put whose token is not the one returned by the previous put.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SequenceTokenMode {
    #[default]
    Disabled,
    Tracked,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Records per put; flushes as soon as the batch reaches this count.
    pub batch_size: usize,
    pub sequence_tokens: SequenceTokenMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            sequence_tokens: SequenceTokenMode::Disabled,
        }
    }
}

pub fn validate_batch_size(batch_size: usize) -> Result<(), ForwarderError> {
    if batch_size > MAX_BATCH_SIZE {
        return Err(ForwarderError::Config(format!(
            "Batch size can not be greater than {MAX_BATCH_SIZE}"
        )));
    }
    if batch_size == 0 {
        return Err(ForwarderError::Config(
            "Batch size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Accumulates records for one destination and ships them in paced,
/// chronologically sorted puts.
///
/// Flushes happen only when a submission crosses the byte or count ceiling, or
/// on an explicit [`flush`](Self::flush) / [`close`](Self::close); there is no
/// background timer. A flush always empties the batch, whether or not the put
/// succeeds: delivery is at-least-once per put, with no local replay queue.
///
/// The engine expects a single owner. Concurrent producers should go through
/// [`LogHandler`](super::LogHandler), which serializes access.
pub struct FlushEngine<C: LogsClient> {
    client: C,
    destination: DestinationIdentity,
    batch: ChronologicalBatch,
    throttle: ThrottleGate,
    bootstrapper: ResourceBootstrapper,
    batch_size: usize,
    sequence_mode: SequenceTokenMode,
    sequence_token: Option<String>,
    stats: Arc<FlushStats>,
}

impl<C: LogsClient> FlushEngine<C> {
    /// Validates the configuration. Nothing is sent to the backend until the
    /// first flush.
    pub fn new(
        client: C,
        destination: DestinationIdentity,
        config: EngineConfig,
    ) -> Result<Self, ForwarderError> {
        validate_batch_size(config.batch_size)?;

        Ok(Self {
            client,
            destination,
            batch: ChronologicalBatch::with_capacity(config.batch_size),
            throttle: ThrottleGate::new(),
            bootstrapper: ResourceBootstrapper::new(),
            batch_size: config.batch_size,
            sequence_mode: config.sequence_tokens,
            sequence_token: None,
            stats: Arc::new(FlushStats::new()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.throttle = ThrottleGate::with_clock(clock);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn destination(&self) -> &DestinationIdentity {
        &self.destination
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn pending_records(&self) -> usize {
        self.batch.size_in_records()
    }

    pub fn pending_bytes(&self) -> usize {
        self.batch.byte_total()
    }

    pub fn sequence_token(&self) -> Option<&str> {
        self.sequence_token.as_deref()
    }

    pub fn stats(&self) -> Arc<FlushStats> {
        Arc::clone(&self.stats)
    }

    /// Adds a record, splitting it into event-sized chunks first.
    ///
    /// Each chunk flushes the batch beforehand if it would push the batch to the
    /// byte ceiling, and afterwards if the batch reached the count ceiling. If a
    /// flush fails, the error is returned and the record's remaining chunks are
    /// not buffered.
    pub async fn submit(&mut self, record: PendingRecord) -> Result<(), ForwarderError> {
        for chunk in chunk_record(record) {
            if self.batch.would_exceed(&chunk, DATA_AMOUNT_LIMIT) {
                self.flush().await?;
            }

            self.batch.append(chunk);

            if self.batch.size_in_records() >= self.batch_size {
                self.flush().await?;
            }
        }
        Ok(())
    }

    /// Sends everything buffered in one put. No-op on an empty batch.
    pub async fn flush(&mut self) -> Result<(), ForwarderError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let bytes = self.batch.byte_total();
        let records = self.batch.drain_sorted_by_timestamp();
        self.stats.record_flush_attempt();

        debug!(
            "Flushing {} records ({} bytes) to {}/{}",
            records.len(),
            bytes,
            self.destination.group_name(),
            self.destination.stream_name()
        );

        let result = self.deliver(&records).await;
        match &result {
            Ok(()) => self.stats.record_flush_success(records.len(), bytes),
            Err(e) => {
                self.stats.record_failed_flush();
                error!(
                    "Dropping batch of {} records for {}/{}: {}",
                    records.len(),
                    self.destination.group_name(),
                    self.destination.stream_name(),
                    e
                );
            }
        }
        result
    }

    /// Final flush. Call once at shutdown, or before abandoning the engine.
    pub async fn close(&mut self) -> Result<(), ForwarderError> {
        let result = self.flush().await;

        let snapshot = self.stats.snapshot();
        info!(
            "Closed {}/{}: {} records in {} flushes, {} failed flushes, {} stream recoveries",
            self.destination.group_name(),
            self.destination.stream_name(),
            snapshot.records_sent,
            snapshot.successful_flushes,
            snapshot.failed_flushes,
            snapshot.stream_recoveries
        );
        result
    }

    /// Points the engine at another stream, flushing the current one first.
    ///
    /// If that flush fails the error is returned and the stream is not switched;
    /// the batch is already empty, so calling again switches immediately.
    pub async fn set_stream_name(
        &mut self,
        stream_name: impl Into<String>,
    ) -> Result<(), ForwarderError> {
        let stream_name = stream_name.into();
        if stream_name == self.destination.stream_name() {
            return Ok(());
        }

        if !self.batch.is_empty() {
            self.close().await?;
        }

        debug!(
            "Switching stream {} -> {}",
            self.destination.stream_name(),
            stream_name
        );
        self.destination.set_stream_name(stream_name);
        self.sequence_token = None;
        Ok(())
    }

    async fn deliver(&mut self, records: &[PendingRecord]) -> Result<(), ForwarderError> {
        let events: Vec<InputLogEvent> = records
            .iter()
            .map(|record| InputLogEvent {
                message: record.message_lossy(),
                timestamp: record.timestamp_millis(),
            })
            .collect();

        let failure = match self.put(events.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        match failure.kind() {
            ErrorKind::NotFound => {
                warn!(
                    "Log stream {}/{} not found, recreating it",
                    self.destination.group_name(),
                    self.destination.stream_name()
                );
                self.bootstrapper
                    .ensure_stream(&self.client, &self.destination)
                    .await?;
                self.stats.record_stream_recovery();
                self.sequence_token = None;
            }
            ErrorKind::InvalidSequenceToken if self.sequence_mode == SequenceTokenMode::Tracked => {
                self.refresh_sequence_token(&failure).await?;
            }
            _ => return Err(failure.into()),
        }

        // One retry only; a second failure of any kind is fatal.
        self.put(events).await.map_err(ForwarderError::from)
    }

    async fn put(&mut self, events: Vec<InputLogEvent>) -> Result<(), ClientError> {
        let sequence_token = match self.sequence_mode {
            SequenceTokenMode::Tracked => self.sequence_token.clone(),
            SequenceTokenMode::Disabled => None,
        };
        let request = PutLogEventsRequest {
            log_group_name: self.destination.group_name().to_string(),
            log_stream_name: self.destination.stream_name().to_string(),
            log_events: events,
            sequence_token,
        };

        self.throttle.acquire().await;
        let response = self.client.put_log_events(request).await?;

        if self.sequence_mode == SequenceTokenMode::Tracked {
            self.sequence_token = response.next_sequence_token;
        }
        Ok(())
    }

    async fn refresh_sequence_token(&mut self, failure: &ClientError) -> Result<(), ForwarderError> {
        self.stats.record_sequence_refresh();

        if let Some(expected) = failure.expected_sequence_token() {
            warn!("Sequence token was stale, adopting the one the backend expects");
            self.sequence_token = Some(expected.to_string());
            return Ok(());
        }

        warn!(
            "Sequence token was stale, refetching it for {}",
            self.destination.stream_name()
        );
        let streams = self
            .client
            .describe_log_streams(DescribeLogStreamsRequest {
                log_group_name: self.destination.group_name().to_string(),
                log_stream_name_prefix: self.destination.stream_name().to_string(),
            })
            .await?;

        let token = streams
            .into_iter()
            .find(|stream| stream.log_stream_name == self.destination.stream_name())
            .and_then(|stream| stream.upload_sequence_token);
        self.sequence_token = token;
        Ok(())
    }
}

impl<C: LogsClient> Drop for FlushEngine<C> {
    fn drop(&mut self) {
        if !self.batch.is_empty() {
            warn!(
                "Dropping {} unflushed records for {}/{}; close() was not called",
                self.batch.size_in_records(),
                self.destination.group_name(),
                self.destination.stream_name()
            );
        }
    }
}
