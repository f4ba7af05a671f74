use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A single event waiting in the batch.
///
/// The message is already fully serialized; level, context and other metadata
/// belong to the formatter and never reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    message: Bytes,
    timestamp_millis: i64,
}

impl PendingRecord {
    pub fn new(message: impl Into<Bytes>, timestamp_millis: i64) -> Self {
        Self {
            message: message.into(),
            timestamp_millis,
        }
    }

    /// Stamps the message with `datetime`, truncated to millisecond resolution.
    pub fn at(message: impl Into<Bytes>, datetime: &DateTime<Utc>) -> Self {
        Self::new(message, datetime.timestamp_millis())
    }

    /// Stamps the message with the current wall-clock time.
    pub fn now(message: impl Into<Bytes>) -> Self {
        Self::at(message, &Utc::now())
    }

    pub fn message(&self) -> &Bytes {
        &self.message
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    /// Message length in bytes.
    pub fn len(&self) -> usize {
        self.message.len()
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }

    /// Message as text. Invalid UTF-8 is replaced rather than rejected.
    pub fn message_lossy(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }
}
