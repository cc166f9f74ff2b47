//! Bounded in-memory log of recent requests
//!
//! Newest entries sit at the front; once the capacity is reached the
//! oldest entry is evicted. Nothing is persisted or deduplicated.

use std::collections::VecDeque;

use crate::protocol::ConnectionLogEntry;

/// Path prefixes recorded unless configured otherwise
pub const DEFAULT_TRACKED_PREFIXES: &[&str] = &["/api/", "/files/"];

#[derive(Debug, Clone)]
pub struct ConnectionLog {
    entries: VecDeque<ConnectionLogEntry>,
    capacity: usize,
    tracked_prefixes: Vec<String>,
}

impl Default for ConnectionLog {
    fn default() -> Self {
        Self::new(crate::MAX_LOG_ENTRIES)
    }
}

impl ConnectionLog {
    pub fn new(capacity: usize) -> Self {
        Self::with_prefixes(
            capacity,
            DEFAULT_TRACKED_PREFIXES.iter().map(|p| p.to_string()).collect(),
        )
    }

    pub fn with_prefixes(capacity: usize, tracked_prefixes: Vec<String>) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            tracked_prefixes,
        }
    }

    /// Whether requests to `path` should be recorded
    pub fn tracks(&self, path: &str) -> bool {
        self.tracked_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Prepend an entry, evicting the oldest beyond capacity
    pub fn record(&mut self, entry: ConnectionLogEntry) {
        self.entries.push_front(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// Entries, newest first
    pub fn snapshot(&self) -> Vec<ConnectionLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
