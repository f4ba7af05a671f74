// Lock-free flush statistics using atomic operations
//
// Shared between the engine and whoever holds a handle to it, so callers can
// read counters without taking the engine lock.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default)]
pub struct FlushStats {
    flush_attempts: AtomicU64,
    successful_flushes: AtomicU64,
    failed_flushes: AtomicU64,
    records_sent: AtomicU64,
    bytes_sent: AtomicU64,
    stream_recoveries: AtomicU64,
    sequence_refreshes: AtomicU64,
    last_flush_time: AtomicU64,
}

/// Point-in-time copy of [`FlushStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushStatsSnapshot {
    pub flush_attempts: u64,
    pub successful_flushes: u64,
    pub failed_flushes: u64,
    pub records_sent: u64,
    pub bytes_sent: u64,
    pub stream_recoveries: u64,
    pub sequence_refreshes: u64,
    /// Unix seconds of the last flush attempt, 0 if none.
    pub last_flush_time: u64,
}

impl FlushStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_flush_attempt(&self) {
        self.flush_attempts.fetch_add(1, Ordering::Relaxed);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.last_flush_time.store(now, Ordering::Relaxed);
    }

    pub fn record_flush_success(&self, records: usize, bytes: usize) {
        self.successful_flushes.fetch_add(1, Ordering::Relaxed);
        self.records_sent.fetch_add(records as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_failed_flush(&self) {
        self.failed_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_recovery(&self) {
        self.stream_recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sequence_refresh(&self) {
        self.sequence_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FlushStatsSnapshot {
        FlushStatsSnapshot {
            flush_attempts: self.flush_attempts.load(Ordering::Relaxed),
            successful_flushes: self.successful_flushes.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            records_sent: self.records_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            stream_recoveries: self.stream_recoveries.load(Ordering::Relaxed),
            sequence_refreshes: self.sequence_refreshes.load(Ordering::Relaxed),
            last_flush_time: self.last_flush_time.load(Ordering::Relaxed),
        }
    }
}
