use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const UNKNOWN_TOTAL: u64 = 0;

/// A live snapshot of how far along a transfer is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressSample {
    Percent(u8),
    Unknown,
}

#[derive(Debug, Default)]
struct Counters {
    transferred: AtomicU64,
    total: AtomicU64,
}

/// The writing half of a progress counter. Owned by the task performing the transfer.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    counters: Arc<Counters>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the expected size of the transfer. `None` means the size is unknown.
    pub fn set_total(&self, total: Option<u64>) {
        self.counters
            .total
            .store(total.unwrap_or(UNKNOWN_TOTAL), Ordering::Relaxed);
    }

    pub fn advance(&self, bytes: u64) {
        self.counters
            .transferred
            .fetch_add(bytes, Ordering::Relaxed);
    }

    /// Start counting from zero again, for example when switching from verifying an existing file
    /// to downloading a fresh copy.
    pub fn reset(&self) {
        self.counters.transferred.store(0, Ordering::Relaxed);
    }

    pub fn reader(&self) -> ProgressReader {
        ProgressReader {
            counters: self.counters.clone(),
        }
    }
}

/// The read-only half of a progress counter. Sampling never blocks.
#[derive(Debug, Clone)]
pub struct ProgressReader {
    counters: Arc<Counters>,
}

impl ProgressReader {
    pub fn sample(&self) -> ProgressSample {
        let total = self.counters.total.load(Ordering::Relaxed);
        if total == UNKNOWN_TOTAL {
            return ProgressSample::Unknown;
        }
        let transferred = self.counters.transferred.load(Ordering::Relaxed) as u128;
        let percent = (transferred * 100 / total as u128).min(100);
        ProgressSample::Percent(percent as u8)
    }
}
