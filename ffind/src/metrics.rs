use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters shared by every worker of a run
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    // Traversal metrics
    directories_listed: Arc<AtomicU64>,
    entries_tested: Arc<AtomicU64>,
    matches_written: Arc<AtomicU64>,

    // Work-stack metrics
    peak_pending: Arc<AtomicU64>,

    // Failure metrics
    errors: Arc<AtomicU64>,
    failed_roots: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            directories_listed: Arc::new(AtomicU64::new(0)),
            entries_tested: Arc::new(AtomicU64::new(0)),
            matches_written: Arc::new(AtomicU64::new(0)),
            peak_pending: Arc::new(AtomicU64::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
            failed_roots: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a directory whose children were listed
    pub fn record_directory(&self, children: usize) {
        self.directories_listed.fetch_add(1, Ordering::Relaxed);
        self.entries_tested
            .fetch_add(children as u64, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.matches_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Records how many directories are waiting on the work stack
    pub fn record_pending(&self, pending: usize) {
        let pending = pending as u64;
        let mut peak = self.peak_pending.load(Ordering::Relaxed);
        while pending > peak {
            match self.peak_pending.compare_exchange_weak(
                peak,
                pending,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }
    }

    /// Records a diagnostic that was reported while the walk went on
    pub fn record_error(&self) {
        let total = self.errors.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Errors so far: {}", total);
    }

    /// Records a root directory that could not be searched at all
    pub fn record_failed_root(&self) {
        self.failed_roots.fetch_add(1, Ordering::Relaxed);
        self.record_error();
    }

    /// Gets the current counters
    pub fn get_stats(&self) -> RunSummary {
        RunSummary {
            directories: self.directories_listed.load(Ordering::Relaxed),
            entries: self.entries_tested.load(Ordering::Relaxed),
            matches: self.matches_written.load(Ordering::Relaxed),
            peak_pending: self.peak_pending.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            failed_roots: self.failed_roots.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Directories listed: {}\n\
             Entries tested: {}\n\
             Matches written: {}\n\
             Peak pending directories: {}\n\
             Errors (failed roots): {} ({})",
            stats.directories,
            stats.entries,
            stats.matches,
            stats.peak_pending,
            stats.errors,
            stats.failed_roots
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub directories: u64,
    pub entries: u64,
    pub matches: u64,
    pub peak_pending: u64,
    pub errors: u64,
    pub failed_roots: u64,
}

impl RunSummary {
    /// True when every directory was listed and no diagnostic was emitted
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}
