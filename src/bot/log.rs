//! Bounded in-memory trade log

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log entry severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSeverity {
    /// Routine lifecycle event
    Info,
    /// Signal evaluation outcome
    Signal,
    /// Completed trade action
    Success,
    /// Failure worth operator attention
    Error,
}

/// One trade log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub severity: LogSeverity,
    /// Human-readable message
    pub message: String,
}

/// Ring buffer of trade events. Oldest entries are evicted once capacity is
/// reached so a long-running bot never grows without bound.
#[derive(Debug)]
pub struct TradeLog {
    entries: VecDeque<TradeLogEntry>,
    capacity: usize,
}

impl TradeLog {
    /// Create a log holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest if full
    pub fn push(&mut self, severity: LogSeverity, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(TradeLogEntry {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        });
    }

    /// All entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &TradeLogEntry> {
        self.entries.iter()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = TradeLog::new(3);
        for i in 0..5 {
            log.push(LogSeverity::Info, format!("event {}", i));
        }

        assert_eq!(log.len(), 3);
        let messages: Vec<_> = log.entries().map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["event 2", "event 3", "event 4"]);
    }

    #[test]
    fn test_clear() {
        let mut log = TradeLog::new(10);
        log.push(LogSeverity::Success, "position closed");
        log.clear();
        assert!(log.is_empty());
    }
}
