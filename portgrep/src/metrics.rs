use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters describing one search, shared by both pipeline stages
#[derive(Debug, Clone, Default)]
pub struct GrepMetrics {
    categories_scanned: Arc<AtomicU64>,
    entries_found: Arc<AtomicU64>,
    makefiles_read: Arc<AtomicU64>,
    makefiles_missing: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
    entries_matched: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
}

impl GrepMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a scanned category and the number of ports found in it
    pub fn record_category(&self, entries: u64) {
        self.categories_scanned.fetch_add(1, Ordering::Relaxed);
        self.entries_found.fetch_add(entries, Ordering::Relaxed);
    }

    pub fn record_read(&self, bytes: u64) {
        self.makefiles_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_missing(&self) {
        self.makefiles_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.entries_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> GrepStats {
        GrepStats {
            categories_scanned: self.categories_scanned.load(Ordering::Relaxed),
            entries_found: self.entries_found.load(Ordering::Relaxed),
            makefiles_read: self.makefiles_read.load(Ordering::Relaxed),
            makefiles_missing: self.makefiles_missing.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            entries_matched: self.entries_matched.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Categories scanned: {}\n\
             Ports found: {}\n\
             Makefiles read/missing: {}/{}\n\
             Bytes read: {}\n\
             Ports matched: {}\n\
             Errors: {}",
            stats.categories_scanned,
            stats.entries_found,
            stats.makefiles_read,
            stats.makefiles_missing,
            stats.bytes_read,
            stats.entries_matched,
            stats.errors
        );
    }
}

/// A snapshot of [`GrepMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrepStats {
    pub categories_scanned: u64,
    pub entries_found: u64,
    pub makefiles_read: u64,
    pub makefiles_missing: u64,
    pub bytes_read: u64,
    pub entries_matched: u64,
    pub errors: u64,
}
