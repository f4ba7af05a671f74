use super::size::record_cost;
use crate::domain::PendingRecord;

/// Records accumulated since the last flush, in append order, with a running cost.
///
/// `byte_total` always equals the sum of `record_cost` over `records`.
#[derive(Debug, Default)]
pub struct ChronologicalBatch {
    records: Vec<PendingRecord>,
    byte_total: usize,
}

impl ChronologicalBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            byte_total: 0,
        }
    }

    pub fn append(&mut self, record: PendingRecord) {
        self.byte_total += record_cost(&record);
        self.records.push(record);
    }

    /// True when appending `record` would bring the batch cost to `limit` or beyond.
    pub fn would_exceed(&self, record: &PendingRecord, limit: usize) -> bool {
        self.byte_total + record_cost(record) >= limit
    }

    pub fn size_in_records(&self) -> usize {
        self.records.len()
    }

    pub fn byte_total(&self) -> usize {
        self.byte_total
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Takes every record, ordered by timestamp, and leaves the batch empty.
    ///
    /// The sort is stable: records sharing a timestamp keep their append order.
    pub fn drain_sorted_by_timestamp(&mut self) -> Vec<PendingRecord> {
        let mut records = std::mem::take(&mut self.records);
        self.byte_total = 0;
        records.sort_by_key(PendingRecord::timestamp_millis);
        records
    }

    /// Discards every record without returning them.
    pub fn reset(&mut self) {
        self.records.clear();
        self.byte_total = 0;
    }
}
