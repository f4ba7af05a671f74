//! Byte accounting under the backend's PutLogEvents rules.
//!
//! A batch costs the sum of its UTF-8 message lengths plus a fixed 26 bytes per
//! event; a single event may not exceed 256 KiB including that overhead.

use crate::domain::PendingRecord;

/// Bytes the backend adds to every event when sizing a batch.
pub const FIXED_OVERHEAD: usize = 26;

/// Largest message a single event may carry (262144 minus the overhead).
pub const EVENT_SIZE_LIMIT: usize = 262_118;

/// Largest total cost of one PutLogEvents request.
pub const DATA_AMOUNT_LIMIT: usize = 1_048_576;

/// Most events one PutLogEvents request may carry.
pub const MAX_BATCH_SIZE: usize = 10_000;

pub fn record_cost(record: &PendingRecord) -> usize {
    record.len() + FIXED_OVERHEAD
}

pub fn batch_cost(records: &[PendingRecord]) -> usize {
    records.iter().map(record_cost).sum()
}

/// Splits a record into pieces of at most `EVENT_SIZE_LIMIT` bytes.
pub fn chunk_record(record: PendingRecord) -> Vec<PendingRecord> {
    chunk_record_with_limit(record, EVENT_SIZE_LIMIT)
}

/// Splits a record into pieces of at most `limit` bytes, all sharing the
/// original timestamp. An empty message yields one empty chunk.
///
/// UTF-8 messages are cut on character boundaries so every piece stays valid
/// text and the pieces concatenate back to the original. Other bytes, or a
/// limit narrower than one character, fall back to plain byte cuts.
pub fn chunk_record_with_limit(record: PendingRecord, limit: usize) -> Vec<PendingRecord> {
    let limit = limit.max(1);
    if record.len() <= limit {
        return vec![record];
    }

    let timestamp = record.timestamp_millis();
    let message = record.message();
    let text = std::str::from_utf8(message).ok();

    let mut chunks = Vec::with_capacity(message.len().div_ceil(limit));
    let mut start = 0;
    while start < message.len() {
        let mut end = usize::min(start + limit, message.len());
        if let Some(text) = text {
            let mut boundary = end;
            while !text.is_char_boundary(boundary) {
                boundary -= 1;
            }
            if boundary > start {
                end = boundary;
            }
        }
        chunks.push(PendingRecord::new(message.slice(start..end), timestamp));
        start = end;
    }
    chunks
}
