use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use vista_core::observability::{LogEntry, LogLevel};

const DEFAULT_CAPACITY: usize = 1024;

/// In-memory buffer of diagnostics, oldest dropped first once full.
pub struct DiagnosticsCollector {
    min_level: LogLevel,
    capacity: usize,
    buffer: Mutex<VecDeque<LogEntry>>,
    counter: AtomicU64,
}

impl Default for DiagnosticsCollector {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}

impl DiagnosticsCollector {
    /// Create a collector keeping entries at `min_level` and above.
    pub fn new(min_level: LogLevel) -> Self {
        Self::with_capacity(min_level, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(min_level: LogLevel, capacity: usize) -> Self {
        Self {
            min_level,
            capacity: capacity.max(1),
            buffer: Mutex::new(VecDeque::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Record a log entry.
    pub fn record(&self, entry: LogEntry) {
        if !entry.matches_level(self.min_level) {
            return;
        }

        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry);
        self.counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Entries at exactly `level`.
    pub fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        self.at_level(LogLevel::Error)
    }

    pub fn warnings(&self) -> Vec<LogEntry> {
        self.at_level(LogLevel::Warn)
    }

    /// Whether any buffered message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.message.contains(needle))
    }

    pub fn clear(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Total entries recorded, including evicted ones.
    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
