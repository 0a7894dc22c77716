// filemask/src/utils/progress.rs
//! Batch progress counters shared by the file workers.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Lock-free counters updated by every worker as files finish.
#[derive(Debug, Default)]
pub struct BatchProgress {
    total: usize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    masked_chars: AtomicU64,
}

/// A point-in-time copy of [`BatchProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub done: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub masked_chars: u64,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Records a finished file and returns how many files are done.
    pub fn record_success(&self, masked_chars: usize) -> usize {
        self.masked_chars.fetch_add(masked_chars as u64, Ordering::Relaxed);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.done()
    }

    /// Records a failed file and returns how many files are done.
    pub fn record_failure(&self) -> usize {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.done()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        ProgressSnapshot {
            total: self.total,
            done: succeeded + failed,
            succeeded,
            failed,
            masked_chars: self.masked_chars.load(Ordering::Relaxed),
        }
    }
}
